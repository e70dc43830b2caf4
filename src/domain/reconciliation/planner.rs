//! Maps discrepancy tags to operator-facing corrective actions.

use serde::{Deserialize, Serialize};

use super::{DiscrepancyTag, ProviderSnapshot, StoreSnapshot};

/// Ordered action descriptions plus whether they can be applied automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    pub actions: Vec<String>,
    pub can_reconcile: bool,
}

/// Builds the plan for a tag list.
///
/// Total over its inputs: every tag has a defined action (possibly none),
/// and the same inputs always give the same plan.
pub fn plan(
    tags: &[DiscrepancyTag],
    provider: Option<&ProviderSnapshot>,
    store: Option<&StoreSnapshot>,
) -> ReconciliationPlan {
    let can_reconcile = provider.is_some() && tags.iter().any(DiscrepancyTag::is_actionable);

    let actions = tags
        .iter()
        .filter_map(|tag| describe(*tag, provider, store))
        .collect();

    ReconciliationPlan {
        actions,
        can_reconcile,
    }
}

fn describe(
    tag: DiscrepancyTag,
    provider: Option<&ProviderSnapshot>,
    store: Option<&StoreSnapshot>,
) -> Option<String> {
    let membership = store.and_then(|s| s.membership.as_ref());
    let card = store.and_then(|s| s.card.as_ref());

    let text = match tag {
        DiscrepancyTag::NoProviderCustomer | DiscrepancyTag::NoDiscrepancy => return None,
        DiscrepancyTag::MissingUser => match provider {
            Some(p) => format!("Create user {} linked to customer {}", p.email, p.customer_id),
            None => "Create user".to_string(),
        },
        DiscrepancyTag::MissingMembership => match provider {
            Some(p) => format!(
                "Create {} membership ({}) ending {}",
                p.plan_type,
                p.status,
                p.period_end.date_string()
            ),
            None => "Create membership".to_string(),
        },
        DiscrepancyTag::StatusMismatch => format!(
            "Update membership status: {} → {}",
            or_unknown(membership.map(|m| m.status.to_string())),
            or_unknown(provider.map(|p| p.status.to_string())),
        ),
        DiscrepancyTag::PlanMismatch => format!(
            "Update membership plan: {} → {}",
            or_unknown(membership.map(|m| m.plan_type.to_string())),
            or_unknown(provider.map(|p| p.plan_type.to_string())),
        ),
        DiscrepancyTag::DateMismatch => format!(
            "Update membership end date: {} → {}",
            or_unknown(membership.map(|m| m.end_date.date_string())),
            or_unknown(provider.map(|p| p.period_end.date_string())),
        ),
        DiscrepancyTag::MissingCard => "Create membership card".to_string(),
        DiscrepancyTag::CardStatusMismatch => format!(
            "Update card status/plan: {} → {}",
            or_unknown(card.map(|c| format!("{}/{}", c.status, c.plan_type))),
            or_unknown(provider.map(|p| format!("{}/{}", p.status, p.plan_type))),
        ),
        DiscrepancyTag::CardDatesMismatch => format!(
            "Update card valid-until: {} → {}",
            or_unknown(card.map(|c| c.valid_until.date_string())),
            or_unknown(provider.map(|p| p.period_end.date_string())),
        ),
    };
    Some(text)
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| "unknown".to_string())
}
