use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Syslog severity levels, ordered from most to least severe.
///
/// The rank of each level is fixed: `emerg` is 0 and `debug` is 7. A record
/// passes a threshold when its rank is less than or equal to the threshold's
/// rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Emerg = 0,
    Alert = 1,
    Crit = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Info = 6,
    Debug = 7,
}

impl Level {
    /// Every level in rank order.
    pub const ALL: [Self; 8] = [
        Self::Emerg,
        Self::Alert,
        Self::Crit,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Info,
        Self::Debug,
    ];

    /// Numeric syslog rank (lower is more severe).
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Look up a level by its numeric rank.
    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(usize::from(rank)).copied()
    }

    /// Look up a level by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
    }

    /// Lowercase level name as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emerg => "emerg",
            Self::Alert => "alert",
            Self::Crit => "crit",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// Whether a record at `self` should pass a `threshold`.
    pub fn passes(self, threshold: Self) -> bool {
        self.rank() <= threshold.rank()
    }
}

/// Uppercase label, as rendered in outgoing messages.
impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Error returned when a level name is not one of the eight syslog names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownLevel(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_syslog_order() {
        let ranks: Vec<u8> = Level::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(Level::Emerg.rank(), 0);
        assert_eq!(Level::Debug.rank(), 7);
    }

    #[test]
    fn name_and_rank_lookups_agree() {
        for level in Level::ALL {
            assert_eq!(Level::from_name(level.as_str()), Some(level));
            assert_eq!(Level::from_rank(level.rank()), Some(level));
        }
        assert_eq!(Level::from_rank(8), None);
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        assert_eq!(Level::from_name("WARNING"), Some(Level::Warning));
        assert_eq!(Level::from_name("Crit"), Some(Level::Crit));
    }

    #[test]
    fn unknown_names_do_not_match() {
        assert_eq!(Level::from_name("warn"), None);
        assert_eq!(Level::from_name("verbose"), None);
        let err = "fatal".parse::<Level>().unwrap_err();
        assert_eq!(err.to_string(), "unknown log level: fatal");
    }

    #[test]
    fn threshold_comparison() {
        assert!(Level::Error.passes(Level::Info));
        assert!(Level::Info.passes(Level::Info));
        assert!(!Level::Debug.passes(Level::Info));
        assert!(Level::Emerg.passes(Level::Emerg));
    }

    #[test]
    fn display_is_uppercase() {
        assert_eq!(Level::Warning.to_string(), "WARNING");
        assert_eq!(Level::Emerg.to_string(), "EMERG");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Level::Notice).unwrap();
        assert_eq!(json, "\"notice\"");
        let level: Level = serde_json::from_str("\"crit\"").unwrap();
        assert_eq!(level, Level::Crit);
    }
}
