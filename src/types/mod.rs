//! Public types exposed by the `casgate-core` crate.

pub mod attribute;
pub mod credentials;
pub mod identity;
pub mod listing;
pub mod permission;

pub use attribute::{CasAttribute, CasAttributes};
pub use credentials::{
    AssumeRoleRequest, ScopedCredentialRequest, ScopedCredentials, TemporaryCredentials,
};
pub use identity::SessionIdentity;
pub use listing::{FolderListing, ListingEntry, ObjectPage, ObjectSummary};
pub use permission::{Capability, PermissionSet, UnknownCapability};
