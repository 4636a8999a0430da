//! Network seam for the CAS validation round trip.

use url::Url;

use crate::Result;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET. Implementations must give up after their timeout and report
/// transport failures as `GateError::Transport`; a non-2xx status is not an
/// error at this layer.
pub trait CasTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse>;
}

impl<T: CasTransport + ?Sized> CasTransport for &T {
    fn get(&self, url: &Url) -> Result<HttpResponse> {
        (**self).get(url)
    }
}

#[cfg(feature = "http")]
pub use http::HttpCasTransport;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use url::Url;

    use super::{CasTransport, HttpResponse};
    use crate::{GateError, Result};

    /// `reqwest` blocking client with a fixed request timeout.
    #[derive(Debug, Clone)]
    pub struct HttpCasTransport {
        client: Client,
    }

    impl HttpCasTransport {
        pub fn new(timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| GateError::Transport {
                    reason: format!("failed to build HTTP client: {err}").into(),
                })?;
            Ok(Self { client })
        }
    }

    impl CasTransport for HttpCasTransport {
        fn get(&self, url: &Url) -> Result<HttpResponse> {
            let response = self
                .client
                .get(url.as_str())
                .send()
                .map_err(|err| GateError::Transport {
                    reason: format!("GET {} failed: {}", redact_query(url), err.without_url()).into(),
                })?;
            let status = response.status().as_u16();
            let body = response.text().map_err(|err| GateError::Transport {
                reason: format!(
                    "reading body from {} failed: {}",
                    redact_query(url),
                    err.without_url()
                )
                .into(),
            })?;
            Ok(HttpResponse { status, body })
        }
    }

    // Service tickets travel in the query string; keep them out of errors.
    fn redact_query(url: &Url) -> String {
        let mut shown = url.clone();
        shown.set_query(None);
        shown.to_string()
    }
}
