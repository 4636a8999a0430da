//! CAS client role: login redirect, ticket validation and response parsing.

pub mod transport;
pub mod validator;
pub mod xml;

#[cfg(feature = "http")]
pub use transport::HttpCasTransport;
pub use transport::{CasTransport, HttpResponse};
pub use validator::TicketValidator;
pub use xml::{TicketValidation, parse_service_response};
