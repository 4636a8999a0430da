//! Session cell bridging and the CAS login/logout flow.
//!
//! Only this module touches the session store. Everything else receives the
//! [`SessionIdentity`] as a value.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use url::Url;

use crate::cas::{CasTransport, TicketValidation, TicketValidator};
use crate::config::GateConfig;
use crate::constants::{
    BROWSE_LANDING_PATH, ENV_CAS_SERVICE_URL, INDEX_PATH, SESSION_IDENTITY_KEY,
};
use crate::guard::RequestContext;
use crate::mapper::AttributeMapper;
use crate::types::SessionIdentity;
use crate::{GateError, Result};

/// Per-session key/value cell. Reads and writes are atomic per call; the
/// surrounding layer serializes concurrent requests for one session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn insert(&mut self, key: &str, value: String) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    values: HashMap<String, String>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn insert(&mut self, key: &str, value: String) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.values.clear();
        Ok(())
    }
}

/// Reads the identity cell. A record that does not decode is treated as no
/// identity at all.
pub fn load_identity<S: SessionStore + ?Sized>(store: &S) -> Result<Option<SessionIdentity>> {
    let Some(raw) = store.get(SESSION_IDENTITY_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<SessionIdentity>(&raw) {
        Ok(identity) => Ok(Some(identity)),
        Err(err) => {
            tracing::warn!(
                target = "casgate::session",
                error = %err,
                "discarding undecodable session identity"
            );
            Ok(None)
        }
    }
}

pub fn store_identity<S: SessionStore + ?Sized>(
    store: &mut S,
    identity: &SessionIdentity,
) -> Result<()> {
    store.insert(SESSION_IDENTITY_KEY, serde_json::to_string(identity)?)
}

/// Result of the `/login` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// No ticket yet: send the browser to CAS.
    RedirectToCas(Url),
    Authenticated {
        identity: SessionIdentity,
        redirect_to: String,
    },
    /// CAS rejected the ticket.
    Unauthorized,
}

impl LoginOutcome {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            LoginOutcome::RedirectToCas(_) | LoginOutcome::Authenticated { .. } => 302,
            LoginOutcome::Unauthorized => 401,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Authenticator<T> {
    validator: TicketValidator<T>,
    mapper: AttributeMapper,
    service_url: Option<String>,
    logout_url: Option<String>,
    dev_identity_path: Option<PathBuf>,
}

impl<T: CasTransport> Authenticator<T> {
    pub fn new(config: &GateConfig, transport: T) -> Self {
        Self {
            validator: TicketValidator::new(config, transport),
            mapper: AttributeMapper::from_config(config),
            service_url: config.cas_service_url.clone(),
            logout_url: config.cas_logout_url.clone(),
            dev_identity_path: config.dev_identity_path.clone(),
        }
    }

    pub fn login<S>(&self, ticket: Option<&str>, store: &mut S) -> Result<LoginOutcome>
    where
        S: SessionStore + ?Sized,
    {
        let service_url = self.service_url()?;
        let Some(ticket) = ticket.filter(|ticket| !ticket.is_empty()) else {
            let url = self.validator.build_login_url(service_url)?;
            return Ok(LoginOutcome::RedirectToCas(url));
        };

        let (principal, attributes) = match self.validator.validate(ticket, service_url)? {
            TicketValidation::Valid {
                principal,
                attributes,
            } => (principal, attributes),
            TicketValidation::Invalid => {
                log::info!("CAS rejected the presented service ticket");
                return Ok(LoginOutcome::Unauthorized);
            }
        };

        let mut identity = SessionIdentity::new(&principal);
        let report = self.mapper.apply(&attributes, &mut identity);
        store_identity(store, &identity)?;
        log::info!(
            "CAS authentication successful for '{}' ({} grants applied, {} rejected)",
            identity.principal(),
            report.applied.len(),
            report.rejected.len()
        );
        Ok(LoginOutcome::Authenticated {
            identity,
            redirect_to: BROWSE_LANDING_PATH.to_string(),
        })
    }

    /// Clears the session and returns where to send the browser.
    pub fn logout<S>(&self, store: &mut S) -> Result<String>
    where
        S: SessionStore + ?Sized,
    {
        store.clear()?;
        log::info!("Logged out.");
        Ok(self
            .logout_url
            .clone()
            .unwrap_or_else(|| INDEX_PATH.to_string()))
    }

    /// Identity for a guarded request.
    ///
    /// Callers whose direct peer is loopback get the developer identity file,
    /// when one is configured, written into the session first.
    pub fn current_identity<S>(
        &self,
        request: &RequestContext,
        store: &mut S,
    ) -> Result<Option<SessionIdentity>>
    where
        S: SessionStore + ?Sized,
    {
        if let Some(path) = self
            .dev_identity_path
            .as_ref()
            .filter(|_| request.is_loopback_peer())
        {
            let raw = fs::read_to_string(path)?;
            match serde_json::from_str::<SessionIdentity>(&raw) {
                Ok(identity) => {
                    tracing::debug!(
                        target = "casgate::session",
                        principal = identity.principal(),
                        path = %path.display(),
                        "using developer identity"
                    );
                    store_identity(store, &identity)?;
                }
                Err(err) => {
                    tracing::warn!(
                        target = "casgate::session",
                        path = %path.display(),
                        error = %err,
                        "could not decode developer identity file"
                    );
                }
            }
        }
        load_identity(store)
    }

    fn service_url(&self) -> Result<&str> {
        self.service_url
            .as_deref()
            .ok_or(GateError::MissingConfiguration {
                variable: ENV_CAS_SERVICE_URL,
            })
    }
}
