use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Recurrence interval stored on a template.
///
/// Unknown stored tokens are kept verbatim in [`Frequency::Unrecognized`] so
/// they survive a load/save cycle and can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    Unrecognized(String),
}

impl Frequency {
    /// Returns the stored token, e.g. `MONTHLY`.
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
            Frequency::Unrecognized(raw) => raw.as_str(),
        }
    }

    /// Human-readable label; unrecognized values pass through unchanged.
    pub fn label(&self) -> String {
        match self {
            Frequency::Daily => "Daily".into(),
            Frequency::Weekly => "Weekly".into(),
            Frequency::Monthly => "Monthly".into(),
            Frequency::Yearly => "Yearly".into(),
            Frequency::Unrecognized(raw) => raw.clone(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Frequency::Unrecognized(_))
    }
}

impl From<&str> for Frequency {
    fn from(raw: &str) -> Self {
        match raw {
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            "MONTHLY" => Frequency::Monthly,
            "YEARLY" => Frequency::Yearly,
            other => Frequency::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        match Frequency::from(raw.as_str()) {
            Frequency::Unrecognized(_) => Frequency::Unrecognized(raw),
            known => known,
        }
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Frequency {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Frequency::from(s))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_parse_to_variants() {
        assert_eq!(Frequency::from("DAILY"), Frequency::Daily);
        assert_eq!(Frequency::from("YEARLY"), Frequency::Yearly);
    }

    #[test]
    fn lowercase_tokens_are_not_coerced() {
        assert_eq!(
            Frequency::from("monthly"),
            Frequency::Unrecognized("monthly".into())
        );
    }

    #[test]
    fn unrecognized_value_survives_serde() {
        let json = serde_json::to_string(&Frequency::from("BIWEEKLY")).unwrap();
        assert_eq!(json, "\"BIWEEKLY\"");
        let back: Frequency = serde_json::from_str(&json).unwrap();
        assert_eq!(back.label(), "BIWEEKLY");
        assert!(!back.is_recognized());
    }
}
