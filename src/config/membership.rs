//! Membership engine tunables

use chrono::Duration as ChronoDuration;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::application::admin::AdminSettings;
use crate::application::card_lifecycle::CardSettings;

use super::error::ValidationError;

/// Card numbering, payload signing, ledger retention and import limits.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipConfig {
    /// Prefix of every membership number, e.g. `MEM-`
    #[serde(default = "default_card_prefix")]
    pub card_number_prefix: String,

    /// Zero-padded digits after the prefix
    #[serde(default = "default_card_width")]
    pub card_number_width: usize,

    /// HMAC key for card verification payloads
    pub card_signing_secret: SecretString,

    /// Days a processed webhook stays in the ledger
    #[serde(default = "default_retention_days")]
    pub webhook_retention_days: u32,

    /// Maximum rows accepted by one bulk import
    #[serde(default = "default_import_limit")]
    pub import_row_limit: usize,
}

impl MembershipConfig {
    pub fn card_settings(&self) -> CardSettings {
        CardSettings {
            number_prefix: self.card_number_prefix.clone(),
            number_width: self.card_number_width,
            signing_secret: self.card_signing_secret.clone(),
        }
    }

    pub fn admin_settings(&self) -> AdminSettings {
        AdminSettings {
            import_row_limit: self.import_row_limit,
        }
    }

    pub fn webhook_retention(&self) -> ChronoDuration {
        ChronoDuration::days(i64::from(self.webhook_retention_days))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let prefix_ok = self
            .card_number_prefix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-');
        if !prefix_ok {
            return Err(ValidationError::InvalidCardPrefix);
        }
        if !(4..=12).contains(&self.card_number_width) {
            return Err(ValidationError::InvalidCardNumberWidth);
        }
        if self.card_signing_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("MEMBERSHIP__CARD_SIGNING_SECRET"));
        }
        if self.webhook_retention_days == 0 {
            return Err(ValidationError::InvalidRetention);
        }
        if self.import_row_limit == 0 || self.import_row_limit > 10_000 {
            return Err(ValidationError::InvalidImportLimit);
        }
        Ok(())
    }
}

fn default_card_prefix() -> String {
    "MEM-".to_string()
}

fn default_card_width() -> usize {
    6
}

fn default_retention_days() -> u32 {
    30
}

fn default_import_limit() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MembershipConfig {
        MembershipConfig {
            card_number_prefix: default_card_prefix(),
            card_number_width: default_card_width(),
            card_signing_secret: SecretString::new("card-key".into()),
            webhook_retention_days: default_retention_days(),
            import_row_limit: default_import_limit(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.webhook_retention(), ChronoDuration::days(30));
        assert_eq!(config.admin_settings().import_row_limit, 1000);
        assert_eq!(config.card_settings().number_prefix, "MEM-");
    }

    #[test]
    fn test_lowercase_prefix_is_refused() {
        let config = MembershipConfig {
            card_number_prefix: "mem-".to_string(),
            ..config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidCardPrefix));
    }

    #[test]
    fn test_width_bounds() {
        for width in [3, 13] {
            let config = MembershipConfig {
                card_number_width: width,
                ..config()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidCardNumberWidth));
        }
    }

    #[test]
    fn test_zero_retention() {
        let config = MembershipConfig {
            webhook_retention_days: 0,
            ..config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRetention));
    }

    #[test]
    fn test_import_limit_bounds() {
        let config = MembershipConfig {
            import_row_limit: 0,
            ..config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidImportLimit));
    }
}
