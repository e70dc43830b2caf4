//! SnapshotLoader - reads both sides of a reconciliation.

use std::sync::Arc;

use crate::domain::membership::{EngineError, Membership};
use crate::domain::reconciliation::{ProviderSnapshot, StoreSnapshot};
use crate::ports::{Customer, PaymentProviderGateway, RecordStore, Subscription};

pub struct SnapshotLoader {
    gateway: Arc<dyn PaymentProviderGateway>,
    store: RecordStore,
}

impl SnapshotLoader {
    pub fn new(gateway: Arc<dyn PaymentProviderGateway>, store: RecordStore) -> Self {
        Self { gateway, store }
    }

    /// Loads the provider snapshot, then the store snapshot keyed by it.
    ///
    /// `email` must already be normalized.
    pub async fn load(
        &self,
        email: &str,
    ) -> Result<(Option<ProviderSnapshot>, Option<StoreSnapshot>), EngineError> {
        let provider = self.provider_snapshot(email).await?;
        let subscription_id = provider.as_ref().map(|p| p.subscription_id.as_str());
        let store = self.store_snapshot(email, subscription_id).await?;
        Ok((provider, store))
    }

    /// Customer by email plus their primary subscription.
    ///
    /// A customer without subscriptions has no snapshot.
    pub async fn provider_snapshot(
        &self,
        email: &str,
    ) -> Result<Option<ProviderSnapshot>, EngineError> {
        let Some(customer) = self.gateway.get_customer_by_email(email).await? else {
            tracing::debug!(email = %email, "No billing customer");
            return Ok(None);
        };

        let subscriptions = self.gateway.list_subscriptions(&customer.id).await?;
        let Some(primary) = primary_subscription(&subscriptions) else {
            tracing::debug!(customer_id = %customer.id, "Billing customer has no subscriptions");
            return Ok(None);
        };

        to_snapshot(email, &customer, primary).map(Some)
    }

    /// The user row, their membership and their card.
    ///
    /// The membership is the one keyed by `subscription_id` when given and
    /// present, else the user's current membership.
    pub async fn store_snapshot(
        &self,
        email: &str,
        subscription_id: Option<&str>,
    ) -> Result<Option<StoreSnapshot>, EngineError> {
        let Some(user) = self.store.users.find_by_email(email).await? else {
            return Ok(None);
        };

        let keyed = match subscription_id {
            Some(sub) => {
                self.store
                    .memberships
                    .find_by_subscription(&user.id, sub)
                    .await?
            }
            None => None,
        };
        let membership = match keyed {
            Some(m) => Some(m),
            None => {
                let all = self.store.memberships.list_for_user(&user.id).await?;
                Membership::select_current(&all).cloned()
            }
        };
        let card = self.store.cards.find_by_user(&user.id).await?;

        Ok(Some(StoreSnapshot {
            user,
            membership,
            card,
        }))
    }
}

/// Most recent non-terminal subscription by period end, else the most recent
/// of any status.
pub fn primary_subscription(subscriptions: &[Subscription]) -> Option<&Subscription> {
    subscriptions
        .iter()
        .filter(|s| !s.status.is_terminal())
        .max_by_key(|s| (s.current_period_end, s.created_at))
        .or_else(|| {
            subscriptions
                .iter()
                .max_by_key(|s| (s.current_period_end, s.created_at))
        })
}

fn to_snapshot(
    email: &str,
    customer: &Customer,
    subscription: &Subscription,
) -> Result<ProviderSnapshot, EngineError> {
    let plan_type = subscription.plan_type.ok_or_else(|| {
        tracing::warn!(subscription_id = %subscription.id, "Subscription price maps to no plan");
        EngineError::provider(format!(
            "Subscription {} is billed under an unrecognised price",
            subscription.id
        ))
    })?;
    let (Some(period_start), Some(period_end)) =
        (subscription.period_start(), subscription.period_end())
    else {
        return Err(EngineError::provider(format!(
            "Subscription {} has an invalid billing period",
            subscription.id
        )));
    };

    Ok(ProviderSnapshot {
        customer_id: customer.id.clone(),
        email: email.to_string(),
        name: customer.name.clone(),
        subscription_id: subscription.id.clone(),
        status: subscription.status.to_membership_status(),
        plan_type,
        period_start,
        period_end,
        auto_renew: !subscription.cancel_at_period_end
            && !subscription.status.is_terminal(),
    })
}
