use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission carried by a library share (group binding or extra share record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SharePermission {
    #[serde(rename = "r")]
    Read,
    #[default]
    #[serde(rename = "rw")]
    ReadWrite,
    #[serde(rename = "admin")]
    Admin,
}

impl SharePermission {
    /// Converts a wire string (`r`, `rw`, `admin`) to a permission.
    pub fn parse(s: &str) -> Option<SharePermission> {
        match s {
            "r" => Some(Self::Read),
            "rw" => Some(Self::ReadWrite),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadWrite => "rw",
            Self::Admin => "admin",
        }
    }

    /// Admin-level group shares cannot be requested when a library is created.
    #[must_use]
    pub const fn is_assignable_on_create(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }
}

impl fmt::Display for SharePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability represents a bitmask of role capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(u32);

impl Capability {
    pub const ADD_REPO: Capability = Capability(1 << 0); // 1
    pub const ADD_GROUP: Capability = Capability(1 << 1); // 2
    pub const GENERATE_SHARE_LINK: Capability = Capability(1 << 2); // 4

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn all() -> Capability {
        Capability(Self::ADD_REPO.0 | Self::ADD_GROUP.0 | Self::GENERATE_SHARE_LINK.0)
    }

    #[must_use]
    pub const fn none() -> Capability {
        Capability(0)
    }

    /// Returns true if this bitmask contains the required capability.
    #[must_use]
    pub const fn has(self, required: Capability) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: Capability) -> Capability {
        Capability(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Capability) -> Capability {
        Capability(self.0 & !other.0)
    }

    /// Converts a capability name to its bitmask value.
    pub fn parse(s: &str) -> Option<Capability> {
        match s {
            "can_add_repo" => Some(Self::ADD_REPO),
            "can_add_group" => Some(Self::ADD_GROUP),
            "can_generate_share_link" => Some(Self::GENERATE_SHARE_LINK),
            _ => None,
        }
    }

    /// Converts capability names to a combined bitmask, failing on the first unknown name.
    pub fn parse_many<S: AsRef<str>>(names: &[S]) -> Option<Capability> {
        let mut result = Capability::default();
        for name in names {
            result = result.union(Self::parse(name.as_ref())?);
        }
        Some(result)
    }

    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.has(Self::ADD_REPO) {
            names.push("can_add_repo");
        }
        if self.has(Self::ADD_GROUP) {
            names.push("can_add_group");
        }
        if self.has(Self::GENERATE_SHARE_LINK) {
            names.push("can_generate_share_link");
        }
        names
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<u32> for Capability {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<Capability> for u32 {
    fn from(c: Capability) -> Self {
        c.0
    }
}
