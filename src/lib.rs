#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::needless_raw_string_hashes
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation lints: internal helpers are self-describing; public entry points
// carry prose where the contract is not obvious from the signature.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Pattern matching: these pedantic lints often reduce clarity.
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]
//
// Ergonomics:
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)] // PermissionSet is a flat flag record
#![allow(clippy::unnecessary_wraps)] // trait impls keep `Result` for fallible backends

//! CAS single sign-on, entitlement-mapped permissions, request authorization,
//! sandboxed bucket paths and least-privilege credential scoping for a web
//! file browser.
//!
//! The flow through the crate:
//!
//! 1. [`Authenticator::login`] redirects to CAS or redeems a service ticket via
//!    [`TicketValidator`], then builds a [`SessionIdentity`] with
//!    [`AttributeMapper`] and writes it to a [`SessionStore`].
//! 2. [`AuthorizationGuard::authorize`] gates every protected request on the
//!    baseline `list_files` capability.
//! 3. [`PathSandbox`] maps browse paths (`top/...`) onto keys below the
//!    configured bucket root; [`BucketBrowser`] runs storage operations behind
//!    per-operation capability checks.
//! 4. [`CredentialScoper`] requests temporary credentials limited to the
//!    caller's transfer capabilities.

/// The casgate-core crate version (matches `Cargo.toml`).
pub const CASGATE_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bucket;
pub mod cas;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod mapper;
pub mod sandbox;
pub mod session;
pub mod types;

pub use bucket::{BucketBrowser, Caller, MemoryObjectStore, ObjectStore};
#[cfg(feature = "http")]
pub use cas::HttpCasTransport;
pub use cas::{CasTransport, HttpResponse, TicketValidation, TicketValidator, parse_service_response};
pub use config::GateConfig;
pub use credentials::{CredentialProvider, CredentialScoper, role_session_name};
pub use error::{GateError, Result};
pub use guard::{AccessDecision, AuthorizationGuard, RequestContext};
pub use mapper::{AttributeMapper, MappingReport, PermissionAction, RejectedGrant, map_profile};
pub use sandbox::{Breadcrumb, PathSandbox, breadcrumbs, is_folder_key};
pub use session::{
    Authenticator, LoginOutcome, MemorySessionStore, SessionStore, load_identity, store_identity,
};
pub use types::{
    AssumeRoleRequest, Capability, CasAttribute, CasAttributes, FolderListing, ListingEntry,
    ObjectPage, ObjectSummary, PermissionSet, ScopedCredentialRequest, ScopedCredentials,
    SessionIdentity, TemporaryCredentials, UnknownCapability,
};
