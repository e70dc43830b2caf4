//! Point-in-time views of one member on either side of the reconciliation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::membership::{Membership, MembershipCard, MembershipStatus, PlanType, User};

/// Billing provider's view of a customer and their primary subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub customer_id: String,
    pub email: String,
    pub name: Option<String>,
    pub subscription_id: String,

    /// Provider subscription state, already mapped onto membership statuses.
    pub status: MembershipStatus,

    pub plan_type: PlanType,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub auto_renew: bool,
}

/// Store's view: the user row plus their membership and live card, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub user: User,
    pub membership: Option<Membership>,
    pub card: Option<MembershipCard>,
}
