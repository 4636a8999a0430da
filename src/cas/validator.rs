//! CAS login redirect and service ticket validation.

use url::Url;

use super::transport::CasTransport;
use super::xml::{TicketValidation, parse_service_response};
use crate::Result;
use crate::config::GateConfig;

/// Performs the CAS protocol round trip against the configured endpoints.
#[derive(Debug, Clone)]
pub struct TicketValidator<T> {
    config: GateConfig,
    transport: T,
}

impl<T: CasTransport> TicketValidator<T> {
    pub fn new(config: &GateConfig, transport: T) -> Self {
        Self {
            config: config.clone(),
            transport,
        }
    }

    /// `<login>?service=<service_url>`, keeping any query the login endpoint
    /// already carries.
    pub fn build_login_url(&self, service_url: &str) -> Result<Url> {
        let mut url = self.config.login_url()?;
        url.query_pairs_mut().append_pair("service", service_url);
        tracing::debug!(target = "casgate::cas", %url, "redirecting to CAS for a service ticket");
        Ok(url)
    }

    /// Redeems `ticket` for `service_url`.
    ///
    /// A rejected ticket or a non-2xx answer is `Ok(TicketValidation::Invalid)`.
    /// Transport failures and malformed responses are errors.
    pub fn validate(&self, ticket: &str, service_url: &str) -> Result<TicketValidation> {
        let mut url = self.config.service_validate_url()?;
        url.query_pairs_mut()
            .append_pair("service", service_url)
            .append_pair("ticket", ticket);

        tracing::debug!(
            target = "casgate::cas",
            ticket_prefix = %ticket_prefix(ticket),
            "validating service ticket"
        );
        let response = self.transport.get(&url)?;
        if !response.is_success() {
            tracing::info!(
                target = "casgate::cas",
                status = response.status,
                body = %response.body,
                "ticket validation request was unsuccessful"
            );
            return Ok(TicketValidation::Invalid);
        }

        let outcome = parse_service_response(&response.body)?;
        if let Some(principal) = outcome.principal() {
            tracing::debug!(target = "casgate::cas", principal, "service ticket was valid");
        }
        Ok(outcome)
    }
}

fn ticket_prefix(ticket: &str) -> &str {
    let end = ticket
        .char_indices()
        .nth(10)
        .map_or(ticket.len(), |(index, _)| index);
    &ticket[..end]
}
