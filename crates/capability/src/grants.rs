//! Grant configuration and checks.

use crate::{CapabilityKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Which grantable capabilities a guest receives.
///
/// Every grantable capability is granted unless listed in `deny`.
/// Non-grantable capabilities are always denied, whatever the file says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Grants {
    /// Capabilities revoked for the guest.
    #[serde(default)]
    pub deny: HashSet<CapabilityKind>,
}

/// Result of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl Grants {
    /// Load grants from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse grants from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Revoke one more capability.
    pub fn deny(mut self, kind: CapabilityKind) -> Self {
        self.deny.insert(kind);
        self
    }

    /// Check whether a capability is granted.
    pub fn check(&self, kind: CapabilityKind) -> Decision {
        if !kind.is_grantable() {
            return Decision::Deny {
                reason: format!("{kind} is never granted to the guest"),
            };
        }
        if self.deny.contains(&kind) {
            return Decision::Deny {
                reason: format!("{kind} is revoked by configuration"),
            };
        }
        Decision::Allow
    }

    pub fn is_granted(&self, kind: CapabilityKind) -> bool {
        self.check(kind).is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_grants_stdio_and_random() {
        let grants = Grants::default();
        assert!(grants.is_granted(CapabilityKind::Random));
        assert!(grants.is_granted(CapabilityKind::Stdout));
        assert!(grants.is_granted(CapabilityKind::Stderr));
        assert!(grants.is_granted(CapabilityKind::Stdin));
    }

    #[test]
    fn test_withheld_capabilities_are_never_granted() {
        let grants = Grants::default();
        for kind in [
            CapabilityKind::Environment,
            CapabilityKind::Preopens,
            CapabilityKind::Filesystem,
        ] {
            let decision = grants.check(kind);
            assert!(!decision.is_allowed());
            assert!(matches!(decision, Decision::Deny { reason } if reason.contains("never granted")));
        }
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
deny = ["random", "stderr"]
"#;
        let grants = Grants::parse(toml).unwrap();

        // Revoked
        assert!(!grants.is_granted(CapabilityKind::Random));
        assert!(!grants.is_granted(CapabilityKind::Stderr));

        // Still granted
        assert!(grants.is_granted(CapabilityKind::Stdout));
        assert!(grants.is_granted(CapabilityKind::Stdin));
    }

    #[test]
    fn test_parse_rejects_unknown_capability() {
        let err = Grants::parse(r#"deny = ["network"]"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = Grants::parse(r#"allow = ["filesystem"]"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.contains("allow")));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Grants::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "deny = [\"stdout\"]").unwrap();
        let grants = Grants::load(file.path()).unwrap();
        assert_eq!(grants, Grants::default().deny(CapabilityKind::Stdout));
    }
}
