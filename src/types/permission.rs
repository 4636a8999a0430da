//! Capability vocabulary and the per-identity permission map.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One named permission. The set is closed; nothing outside it is ever read
/// or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ListFiles,
    CreateFolder,
    RemoveFolder,
    DownloadFile,
    UploadFile,
    RemoveFile,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::ListFiles,
        Capability::CreateFolder,
        Capability::RemoveFolder,
        Capability::DownloadFile,
        Capability::UploadFile,
        Capability::RemoveFile,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ListFiles => "list_files",
            Capability::CreateFolder => "create_folder",
            Capability::RemoveFolder => "remove_folder",
            Capability::DownloadFile => "download_file",
            Capability::UploadFile => "upload_file",
            Capability::RemoveFile => "remove_file",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCapability(pub String);

impl fmt::Display for UnknownCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown capability `{}`", self.0)
    }
}

impl std::error::Error for UnknownCapability {}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|capability| capability.as_str() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// Capability name -> granted flag. Serializes as the flat map stored in the
/// session (`{"list_files": false, ...}`); missing keys deserialize as denied
/// and unknown keys are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSet {
    pub list_files: bool,
    pub create_folder: bool,
    pub remove_folder: bool,
    pub download_file: bool,
    pub upload_file: bool,
    pub remove_file: bool,
}

impl PermissionSet {
    /// Everything denied.
    #[must_use]
    pub fn denied() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::ListFiles => self.list_files,
            Capability::CreateFolder => self.create_folder,
            Capability::RemoveFolder => self.remove_folder,
            Capability::DownloadFile => self.download_file,
            Capability::UploadFile => self.upload_file,
            Capability::RemoveFile => self.remove_file,
        }
    }

    pub fn set(&mut self, capability: Capability, granted: bool) {
        let slot = match capability {
            Capability::ListFiles => &mut self.list_files,
            Capability::CreateFolder => &mut self.create_folder,
            Capability::RemoveFolder => &mut self.remove_folder,
            Capability::DownloadFile => &mut self.download_file,
            Capability::UploadFile => &mut self.upload_file,
            Capability::RemoveFile => &mut self.remove_file,
        };
        *slot = granted;
    }

    /// Lookup by name. A name outside the vocabulary is a caller bug: it is
    /// logged and answered as denied.
    #[must_use]
    pub fn get_named(&self, name: &str) -> bool {
        match name.parse::<Capability>() {
            Ok(capability) => self.get(capability),
            Err(err) => {
                tracing::error!(target = "casgate::permissions", error = %err, "capability lookup outside vocabulary");
                false
            }
        }
    }

    pub fn granted(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.get(*capability))
    }
}
