use std::{fmt, str::FromStr};

/// How a key is protected from garbage collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PinMode {
    /// The key and all of its descendants.
    Recursive,
    /// Only the key itself.
    Direct,
    /// Protected because a recursively pinned ancestor links to it.
    Indirect,
    NotPinned,
}

impl PinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinMode::Recursive => "recursive",
            PinMode::Direct => "direct",
            PinMode::Indirect => "indirect",
            PinMode::NotPinned => "not_pinned",
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown pin mode: {0}")]
pub struct ParseModeError(String);

impl FromStr for PinMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recursive" => Ok(PinMode::Recursive),
            "direct" => Ok(PinMode::Direct),
            "indirect" => Ok(PinMode::Indirect),
            "not_pinned" => Ok(PinMode::NotPinned),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Selects which pins a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFilter {
    Mode(PinMode),
    All,
}

impl PinFilter {
    pub fn includes(&self, mode: PinMode) -> bool {
        match self {
            PinFilter::All => mode != PinMode::NotPinned,
            PinFilter::Mode(m) => *m == mode,
        }
    }
}

impl FromStr for PinFilter {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(PinFilter::All),
            "not_pinned" => Err(ParseModeError(s.to_string())),
            other => other.parse().map(PinFilter::Mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_string_roundtrip() {
        for mode in [
            PinMode::Recursive,
            PinMode::Direct,
            PinMode::Indirect,
            PinMode::NotPinned,
        ] {
            assert_eq!(mode.to_string().parse::<PinMode>(), Ok(mode));
        }
        assert!("sideways".parse::<PinMode>().is_err());
    }

    #[test]
    fn filter_parsing() {
        assert_eq!("all".parse::<PinFilter>(), Ok(PinFilter::All));
        assert_eq!(
            "direct".parse::<PinFilter>(),
            Ok(PinFilter::Mode(PinMode::Direct))
        );
        assert!("not_pinned".parse::<PinFilter>().is_err());
        assert!(PinFilter::All.includes(PinMode::Indirect));
        assert!(!PinFilter::Mode(PinMode::Direct).includes(PinMode::Recursive));
    }
}
