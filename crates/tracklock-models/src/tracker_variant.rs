//! Tracking algorithm variants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Interchangeable classical tracking algorithms.
///
/// The variant is chosen once per lock cycle; switching requires a new lock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackerVariant {
    /// Forward-backward error median flow
    MedianFlow,
    /// Discriminative correlation filter with channel and spatial reliability
    Csrt,
    /// Kernelized correlation filter
    #[default]
    Kcf,
    /// Minimum output sum of squared error filter
    Mosse,
    /// Tracking-learning-detection
    Tld,
    /// Multiple instance learning
    Mil,
}

impl TrackerVariant {
    pub const ALL: &'static [TrackerVariant] = &[
        TrackerVariant::MedianFlow,
        TrackerVariant::Csrt,
        TrackerVariant::Kcf,
        TrackerVariant::Mosse,
        TrackerVariant::Tld,
        TrackerVariant::Mil,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerVariant::MedianFlow => "median_flow",
            TrackerVariant::Csrt => "csrt",
            TrackerVariant::Kcf => "kcf",
            TrackerVariant::Mosse => "mosse",
            TrackerVariant::Tld => "tld",
            TrackerVariant::Mil => "mil",
        }
    }

    /// Parse a configured name, falling back to `MedianFlow` when unknown.
    pub fn parse_or_fallback(name: &str) -> (Self, bool) {
        match name.parse() {
            Ok(variant) => (variant, true),
            Err(_) => (TrackerVariant::MedianFlow, false),
        }
    }
}

impl fmt::Display for TrackerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrackerVariant {
    type Err = TrackerVariantParseError;

    /// Accepts `kcf`, `KCF`, `TrackerKCF`, `median_flow`, `MedianFlow`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix("tracker").unwrap_or(&lower);
        let name: String = name.chars().filter(|c| *c != '_' && *c != '-').collect();
        match name.as_str() {
            "medianflow" => Ok(TrackerVariant::MedianFlow),
            "csrt" => Ok(TrackerVariant::Csrt),
            "kcf" => Ok(TrackerVariant::Kcf),
            "mosse" => Ok(TrackerVariant::Mosse),
            "tld" => Ok(TrackerVariant::Tld),
            "mil" => Ok(TrackerVariant::Mil),
            _ => Err(TrackerVariantParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown tracker variant: {0}")]
pub struct TrackerVariantParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_library_names() {
        assert_eq!("TrackerKCF".parse::<TrackerVariant>().unwrap(), TrackerVariant::Kcf);
        assert_eq!(
            "TrackerMedianFlow".parse::<TrackerVariant>().unwrap(),
            TrackerVariant::MedianFlow
        );
        assert_eq!("csrt".parse::<TrackerVariant>().unwrap(), TrackerVariant::Csrt);
        assert_eq!("median_flow".parse::<TrackerVariant>().unwrap(), TrackerVariant::MedianFlow);
        assert_eq!(" MOSSE ".parse::<TrackerVariant>().unwrap(), TrackerVariant::Mosse);
    }

    #[test]
    fn test_display_round_trips() {
        for variant in TrackerVariant::ALL {
            assert_eq!(variant.to_string().parse::<TrackerVariant>().unwrap(), *variant);
        }
    }

    #[test]
    fn test_unknown_falls_back_to_median_flow() {
        assert!("boosting".parse::<TrackerVariant>().is_err());
        assert_eq!(
            TrackerVariant::parse_or_fallback("boosting"),
            (TrackerVariant::MedianFlow, false)
        );
        assert_eq!(
            TrackerVariant::parse_or_fallback("TrackerTLD"),
            (TrackerVariant::Tld, true)
        );
    }

    #[test]
    fn test_default_is_kcf() {
        assert_eq!(TrackerVariant::default(), TrackerVariant::Kcf);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&TrackerVariant::MedianFlow).unwrap();
        assert_eq!(json, "\"median_flow\"");
    }
}
