//! Membership plan types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Plan a membership is billed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// One named member.
    Individual,

    /// A household on one membership.
    Family,
}

impl PlanType {
    /// Wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Individual => "individual",
            PlanType::Family => "family",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(PlanType::Individual),
            "family" => Ok(PlanType::Family),
            _ => Err(ValidationError::invalid_format(
                "plan_type",
                format!("unknown plan type '{}'", s),
            )),
        }
    }
}
