use std::fmt;
use serde::{Serialize, Deserialize};

/// Stable document id, assigned by the registry and never reused for another document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u64);

impl DocId {
    pub fn new(id: u64) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DocId {
    fn from(id: u64) -> Self {
        DocId(id)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who may see the documents of a pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionClass {
    User,
    Group,
    Others,
}

impl PermissionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionClass::User => "user",
            PermissionClass::Group => "group",
            PermissionClass::Others => "others",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(PermissionClass::User),
            "group" => Some(PermissionClass::Group),
            "others" => Some(PermissionClass::Others),
            _ => None,
        }
    }

    /// Pods of this class can be offered to users other than the owner
    pub fn is_shared(&self) -> bool {
        !matches!(self, PermissionClass::User)
    }
}

/// Composite pod identifier: (owner hash, device, language, permission class).
///
/// The ordering is used to lock several pods without deadlocking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PodKey {
    pub owner: String,
    pub device: String,
    pub language: String,
    pub permission: PermissionClass,
}

impl PodKey {
    pub fn new(owner: &str, device: &str, language: &str, permission: PermissionClass) -> Self {
        PodKey {
            owner: owner.to_string(),
            device: device.to_string(),
            language: language.to_string(),
            permission,
        }
    }

    /// `owner/device/lang/class`, also the pod's relative location on disk
    pub fn path_components(&self) -> [&str; 4] {
        [&self.owner, &self.device, &self.language, self.permission.as_str()]
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner == owner
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.owner, self.device, self.language, self.permission.as_str())
    }
}
