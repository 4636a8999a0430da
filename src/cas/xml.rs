//! `serviceValidate` response parsing.
//!
//! The response is small, so it is read into a namespace-agnostic element
//! tree first and then walked by local name. Prefixes (`cas:` or whatever the
//! server uses) are ignored everywhere.

use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};

use crate::types::{CasAttribute, CasAttributes};
use crate::{GateError, Result};

const SUCCESS_TAG: &str = "authenticationSuccess";
const USER_TAG: &str = "user";
const ATTRIBUTES_TAG: &str = "attributes";

/// Outcome of a ticket validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketValidation {
    Valid {
        principal: String,
        attributes: CasAttributes,
    },
    /// `authenticationFailure`, any other non-success result, or a non-2xx
    /// status from the validation endpoint.
    Invalid,
}

impl TicketValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, TicketValidation::Valid { .. })
    }

    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        match self {
            TicketValidation::Valid { principal, .. } => Some(principal),
            TicketValidation::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct XmlElement {
    pub local_name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// First direct child with the given local name, scanning in order.
    pub fn find_child(&self, local_name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|child| child.local_name == local_name)
    }
}

pub fn parse_service_response(body: &str) -> Result<TicketValidation> {
    let root = parse_tree(body)?;
    let Some(result) = root.children.first() else {
        return Err(protocol("response root has no result element"));
    };
    if result.local_name != SUCCESS_TAG {
        tracing::debug!(target = "casgate::cas", tag = %result.local_name, "validation rejected");
        return Ok(TicketValidation::Invalid);
    }

    let user = result
        .find_child(USER_TAG)
        .ok_or_else(|| protocol("authenticationSuccess without a user element"))?;
    let principal = user.text.trim().to_lowercase();
    if principal.is_empty() {
        return Err(protocol("authenticationSuccess with an empty user"));
    }

    let attributes = result
        .find_child(ATTRIBUTES_TAG)
        .map(|attributes| {
            attributes
                .children
                .iter()
                .map(|attribute| {
                    CasAttribute::new(attribute.local_name.clone(), attribute.text.trim())
                })
                .collect::<CasAttributes>()
        })
        .unwrap_or_default();

    Ok(TicketValidation::Valid {
        principal,
        attributes,
    })
}

pub(crate) fn parse_tree(xml: &str) -> Result<XmlElement> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    reader.check_end_names(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|err| {
            protocol(format!(
                "malformed XML at byte {}: {err}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(ref start) => {
                stack.push(element_from(start)?);
            }
            Event::Empty(ref start) => {
                let element = element_from(start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| protocol("closing tag without an open element"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|err| protocol(format!("bad text content: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&value);
                }
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let value = std::str::from_utf8(&bytes)
                    .map_err(|err| protocol(format!("CDATA is not UTF-8: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(protocol("document ended with unclosed elements"));
    }
    root.ok_or_else(|| protocol("document has no root element"))
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement> {
    let local_name = std::str::from_utf8(start.local_name().as_ref())
        .map_err(|err| protocol(format!("tag name is not UTF-8: {err}")))?
        .to_string();
    Ok(XmlElement {
        local_name,
        ..XmlElement::default()
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(protocol("document has more than one root element"));
    }
    *root = Some(element);
    Ok(())
}

fn protocol(reason: impl Into<Box<str>>) -> GateError {
    GateError::Protocol {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_WITH_ATTRIBUTES: &str = r#"
<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>JDoe</cas:user>
    <cas:attributes>
      <cas:givenName>Jane</cas:givenName>
      <cas:sn>Doe</cas:sn>
      <cas:eduPersonEntitlement>https://s3browser.example.net/example_bucket/permissions?list_files=allow&amp;download_file=allow</cas:eduPersonEntitlement>
    </cas:attributes>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#;

    #[test]
    fn success_yields_principal_and_ordered_attributes() {
        let response = parse_service_response(SUCCESS_WITH_ATTRIBUTES).expect("parse");
        let TicketValidation::Valid {
            principal,
            attributes,
        } = response
        else {
            panic!("expected success");
        };
        assert_eq!(principal, "jdoe");
        let names: Vec<&str> = attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["givenName", "sn", "eduPersonEntitlement"]);
        let entitlement = &attributes.iter().last().expect("entitlement").value;
        assert!(entitlement.ends_with("list_files=allow&download_file=allow"));
    }

    #[test]
    fn prefix_is_irrelevant() {
        let xml = r#"<sso:serviceResponse xmlns:sso="urn:x"><sso:authenticationSuccess><sso:user>bob</sso:user></sso:authenticationSuccess></sso:serviceResponse>"#;
        let response = parse_service_response(xml).expect("parse");
        assert_eq!(
            response,
            TicketValidation::Valid {
                principal: "bob".to_string(),
                attributes: CasAttributes::new(),
            }
        );
    }

    #[test]
    fn failure_tag_is_a_negative_outcome() {
        let xml = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationFailure code="INVALID_TICKET">Ticket ST-1 not recognized</cas:authenticationFailure>
</cas:serviceResponse>"#;
        assert_eq!(
            parse_service_response(xml).expect("parse"),
            TicketValidation::Invalid
        );
    }

    #[test]
    fn malformed_xml_is_a_protocol_error() {
        for body in [
            "<cas:serviceResponse><cas:authenticationSuccess>",
            "<a><b></a></b>",
            "",
            "not xml at all",
        ] {
            let err = parse_service_response(body).expect_err(body);
            assert!(matches!(err, GateError::Protocol { .. }), "{body}: {err:?}");
        }
    }

    #[test]
    fn success_without_user_is_a_protocol_error() {
        let xml = "<r><authenticationSuccess><attributes/></authenticationSuccess></r>";
        assert!(matches!(
            parse_service_response(xml),
            Err(GateError::Protocol { .. })
        ));
    }

    #[test]
    fn empty_attribute_element_has_empty_value() {
        let xml = "<r><authenticationSuccess><user>x</user><attributes><mail/></attributes></authenticationSuccess></r>";
        let TicketValidation::Valid { attributes, .. } =
            parse_service_response(xml).expect("parse")
        else {
            panic!("expected success");
        };
        assert_eq!(attributes.iter().next(), Some(&CasAttribute::new("mail", "")));
    }
}
