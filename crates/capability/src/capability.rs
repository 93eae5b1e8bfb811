use std::fmt;

use serde::{Deserialize, Serialize};

/// Capability groups the host can expose to a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Random,
    Stdin,
    Stdout,
    Stderr,
    Environment,
    Preopens,
    Filesystem,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 7] = [
        Self::Random,
        Self::Stdin,
        Self::Stdout,
        Self::Stderr,
        Self::Environment,
        Self::Preopens,
        Self::Filesystem,
    ];

    /// Whether configuration may grant this capability at all.
    ///
    /// Environment, preopened directories and the filesystem are withheld
    /// from every guest.
    pub fn is_grantable(&self) -> bool {
        matches!(
            self,
            Self::Random | Self::Stdin | Self::Stdout | Self::Stderr
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Environment => "environment",
            Self::Preopens => "preopens",
            Self::Filesystem => "filesystem",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
