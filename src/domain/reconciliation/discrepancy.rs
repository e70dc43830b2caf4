//! Discrepancy detection between provider and store snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ProviderSnapshot, StoreSnapshot};

/// Allowed drift, in days, between billing dates and stored dates.
pub const DATE_TOLERANCE_DAYS: i64 = 1;

/// One named kind of divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyTag {
    NoProviderCustomer,
    MissingUser,
    MissingMembership,
    StatusMismatch,
    PlanMismatch,
    DateMismatch,
    MissingCard,
    /// Card status or card plan differs from the membership.
    CardStatusMismatch,
    CardDatesMismatch,
    NoDiscrepancy,
}

impl DiscrepancyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyTag::NoProviderCustomer => "NO_PROVIDER_CUSTOMER",
            DiscrepancyTag::MissingUser => "MISSING_USER",
            DiscrepancyTag::MissingMembership => "MISSING_MEMBERSHIP",
            DiscrepancyTag::StatusMismatch => "STATUS_MISMATCH",
            DiscrepancyTag::PlanMismatch => "PLAN_MISMATCH",
            DiscrepancyTag::DateMismatch => "DATE_MISMATCH",
            DiscrepancyTag::MissingCard => "MISSING_CARD",
            DiscrepancyTag::CardStatusMismatch => "CARD_STATUS_MISMATCH",
            DiscrepancyTag::CardDatesMismatch => "CARD_DATES_MISMATCH",
            DiscrepancyTag::NoDiscrepancy => "NO_DISCREPANCY",
        }
    }

    /// True for tags that describe something to correct.
    pub fn is_actionable(&self) -> bool {
        !matches!(
            self,
            DiscrepancyTag::NoProviderCustomer | DiscrepancyTag::NoDiscrepancy
        )
    }
}

impl fmt::Display for DiscrepancyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares the two snapshots and names every divergence, in rule order.
///
/// Never empty: an in-sync pair yields `[NO_DISCREPANCY]`.
pub fn detect(
    provider: Option<&ProviderSnapshot>,
    store: Option<&StoreSnapshot>,
) -> Vec<DiscrepancyTag> {
    let Some(provider) = provider else {
        return vec![DiscrepancyTag::NoProviderCustomer];
    };
    let Some(store) = store else {
        return vec![
            DiscrepancyTag::MissingUser,
            DiscrepancyTag::MissingMembership,
            DiscrepancyTag::MissingCard,
        ];
    };

    let mut tags = Vec::new();

    match &store.membership {
        None => push_unique(&mut tags, DiscrepancyTag::MissingMembership),
        Some(membership) => {
            if membership.status != provider.status {
                push_unique(&mut tags, DiscrepancyTag::StatusMismatch);
            }
            if membership.plan_type != provider.plan_type {
                push_unique(&mut tags, DiscrepancyTag::PlanMismatch);
            }
            if !provider
                .period_end
                .within_days_of(&membership.end_date, DATE_TOLERANCE_DAYS)
            {
                push_unique(&mut tags, DiscrepancyTag::DateMismatch);
            }
        }
    }

    match (&store.card, &store.membership) {
        (None, _) => push_unique(&mut tags, DiscrepancyTag::MissingCard),
        (Some(card), Some(membership)) => {
            if card.status != membership.status {
                push_unique(&mut tags, DiscrepancyTag::CardStatusMismatch);
            }
            if card.plan_type != membership.plan_type {
                push_unique(&mut tags, DiscrepancyTag::CardStatusMismatch);
            }
            if !card
                .valid_until
                .within_days_of(&membership.end_date, DATE_TOLERANCE_DAYS)
            {
                push_unique(&mut tags, DiscrepancyTag::CardDatesMismatch);
            }
        }
        (Some(_), None) => {}
    }

    if tags.is_empty() {
        tags.push(DiscrepancyTag::NoDiscrepancy);
    }
    tags
}

fn push_unique(tags: &mut Vec<DiscrepancyTag>, tag: DiscrepancyTag) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}
