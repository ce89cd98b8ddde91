//! WoE trend constraints shared by the ChiMerge pass and the MIP solver

use serde::Serialize;

/// Required WoE trend across ordered bins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonotonicityConstraint {
    /// WoE can vary freely
    None,
    /// WoE must increase with feature value (higher values = higher churn risk)
    Ascending,
    /// WoE must decrease with feature value
    Descending,
    /// Pick whichever trend fits the data better
    #[default]
    Auto,
}

impl std::fmt::Display for MonotonicityConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonotonicityConstraint::None => write!(f, "none"),
            MonotonicityConstraint::Ascending => write!(f, "ascending"),
            MonotonicityConstraint::Descending => write!(f, "descending"),
            MonotonicityConstraint::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for MonotonicityConstraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(MonotonicityConstraint::None),
            "ascending" | "asc" => Ok(MonotonicityConstraint::Ascending),
            "descending" | "desc" => Ok(MonotonicityConstraint::Descending),
            "auto" => Ok(MonotonicityConstraint::Auto),
            _ => Err(format!(
                "Unknown monotonicity constraint: '{}'. \
                 Use 'none', 'ascending', 'descending', or 'auto'.",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonicity_from_str() {
        assert_eq!("none".parse::<MonotonicityConstraint>().unwrap(), MonotonicityConstraint::None);
        assert_eq!(
            "ASC".parse::<MonotonicityConstraint>().unwrap(),
            MonotonicityConstraint::Ascending
        );
        assert_eq!(
            "desc".parse::<MonotonicityConstraint>().unwrap(),
            MonotonicityConstraint::Descending
        );
        assert_eq!("auto".parse::<MonotonicityConstraint>().unwrap(), MonotonicityConstraint::Auto);
        assert!("peak".parse::<MonotonicityConstraint>().is_err());
    }

    #[test]
    fn test_monotonicity_display_round_trips() {
        for m in [
            MonotonicityConstraint::None,
            MonotonicityConstraint::Ascending,
            MonotonicityConstraint::Descending,
            MonotonicityConstraint::Auto,
        ] {
            assert_eq!(m.to_string().parse::<MonotonicityConstraint>().unwrap(), m);
        }
    }
}
