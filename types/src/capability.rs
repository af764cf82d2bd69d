//! Capabilities gating privileged effects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named privilege that collaborators must hold before touching the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Local filesystem and console access.
    Filesystem,
    /// Inspection and mutation of host values.
    HostReflection,
    /// Tracking evaluation running time.
    Statistics,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Filesystem,
        Capability::HostReflection,
        Capability::Statistics,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Capability::Filesystem => "filesystem",
            Capability::HostReflection => "host_reflection",
            Capability::Statistics => "statistics",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Capability::Filesystem => 1,
            Capability::HostReflection => 1 << 1,
            Capability::Statistics => 1 << 2,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability '{0}'; expected one of: filesystem, host_reflection, statistics")]
pub struct ParseCapabilityError(pub String);

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCapabilityError(s.to_string()))
    }
}

/// A set of enabled capabilities.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn all() -> Self {
        Self(
            Capability::Filesystem.bit()
                | Capability::HostReflection.bit()
                | Capability::Statistics.bit(),
        )
    }

    #[must_use]
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub fn set(&mut self, cap: Capability, enabled: bool) {
        if enabled {
            self.0 |= cap.bit();
        } else {
            self.0 &= !cap.bit();
        }
    }

    #[must_use]
    pub fn with(mut self, cap: Capability, enabled: bool) -> Self {
        self.set(cap, enabled);
        self
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Capabilities::none(), |set, cap| set.with(cap, true))
    }
}

#[cfg(test)]
mod tests {
    use super::{Capabilities, Capability};

    #[test]
    fn set_and_clear() {
        let mut caps = Capabilities::all();
        assert!(caps.contains(Capability::Filesystem));
        caps.set(Capability::Filesystem, false);
        assert!(!caps.contains(Capability::Filesystem));
        assert!(caps.contains(Capability::Statistics));
        assert_eq!(
            caps.iter().collect::<Vec<_>>(),
            vec![Capability::HostReflection, Capability::Statistics]
        );
    }

    #[test]
    fn parse_names() {
        assert_eq!("filesystem".parse::<Capability>(), Ok(Capability::Filesystem));
        assert_eq!(" Statistics ".parse::<Capability>(), Ok(Capability::Statistics));
        assert!("network".parse::<Capability>().is_err());
    }

    #[test]
    fn collect_into_set() {
        let caps: Capabilities = [Capability::Statistics].into_iter().collect();
        assert!(caps.contains(Capability::Statistics));
        assert!(!caps.contains(Capability::Filesystem));
        assert_eq!(Capabilities::none().iter().count(), 0);
    }
}
