use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A top-level sport vertical. Each one owns a root path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sport {
    Tennis,
    Football,
    Basketball,
    BetOfTheDay,
}

impl Sport {
    pub const ALL: [Sport; 4] = [
        Sport::Tennis,
        Sport::Football,
        Sport::Basketball,
        Sport::BetOfTheDay,
    ];

    /// The path segment this sport is served under.
    pub fn as_segment(self) -> &'static str {
        match self {
            Self::Tennis => "tennis",
            Self::Football => "football",
            Self::Basketball => "basketball",
            Self::BetOfTheDay => "bet-of-the-day",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sport segment: {0}")]
pub struct UnknownSport(pub String);

impl FromStr for Sport {
    type Err = UnknownSport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sport| sport.as_segment() == s)
            .ok_or_else(|| UnknownSport(s.to_string()))
    }
}

impl std::fmt::Display for Sport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_round_trip() {
        for sport in Sport::ALL {
            assert_eq!(sport.as_segment().parse::<Sport>(), Ok(sport));
        }
    }

    #[test]
    fn test_segment_is_case_sensitive() {
        assert!("Football".parse::<Sport>().is_err());
        assert!("footballer".parse::<Sport>().is_err());
        assert!("".parse::<Sport>().is_err());
    }

    #[test]
    fn test_serde_uses_segment() {
        let json = serde_json::to_string(&Sport::BetOfTheDay).unwrap();
        assert_eq!(json, "\"bet-of-the-day\"");
        let back: Sport = serde_json::from_str("\"basketball\"").unwrap();
        assert_eq!(back, Sport::Basketball);
    }
}
