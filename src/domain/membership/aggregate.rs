//! Membership record.
//!
//! One record exists per (user, billing subscription). Manually created
//! memberships have no subscription id. Records are never hard-deleted: an
//! administrator's delete sets the status to `deleted`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MembershipId, Timestamp, UserId, ValidationError};

use super::{MembershipStatus, PlanType};

/// Billing-derived fields a membership is synchronised to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingTerms {
    pub plan_type: PlanType,
    pub status: MembershipStatus,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub auto_renew: bool,
}

/// Membership record.
///
/// # Invariants
///
/// - `end_date >= start_date`
/// - `billing_subscription_id` and `id` never change after insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub billing_subscription_id: Option<String>,
    pub plan_type: PlanType,
    pub status: MembershipStatus,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub auto_renew: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Membership {
    /// Creates a membership from billing terms.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` on `end_date` if the window is inverted.
    pub fn new(
        user_id: UserId,
        billing_subscription_id: Option<String>,
        terms: BillingTerms,
    ) -> Result<Self, ValidationError> {
        validate_window(&terms.start_date, &terms.end_date)?;
        let now = Timestamp::now();
        Ok(Self {
            id: MembershipId::new(),
            user_id,
            billing_subscription_id,
            plan_type: terms.plan_type,
            status: terms.status,
            start_date: terms.start_date,
            end_date: terms.end_date,
            auto_renew: terms.auto_renew,
            created_at: now,
            updated_at: now,
        })
    }

    /// Current billing terms of this record.
    pub fn terms(&self) -> BillingTerms {
        BillingTerms {
            plan_type: self.plan_type,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
            auto_renew: self.auto_renew,
        }
    }

    /// Overwrites the mutable billing fields. Returns true if anything changed.
    ///
    /// Identity and subscription id are left alone. A soft-deleted record is
    /// never revived: billing terms are ignored once the status is `deleted`.
    pub fn apply_terms(&mut self, terms: &BillingTerms) -> Result<bool, ValidationError> {
        validate_window(&terms.start_date, &terms.end_date)?;
        if self.is_deleted() || self.terms() == *terms {
            return Ok(false);
        }
        self.plan_type = terms.plan_type;
        self.status = terms.status;
        self.start_date = terms.start_date;
        self.end_date = terms.end_date;
        self.auto_renew = terms.auto_renew;
        self.updated_at = Timestamp::now();
        Ok(true)
    }

    /// Administrative adjustment of end date and/or status.
    pub fn adjust(
        &mut self,
        end_date: Option<Timestamp>,
        status: Option<MembershipStatus>,
    ) -> Result<(), ValidationError> {
        if let Some(end) = end_date {
            validate_window(&self.start_date, &end)?;
            self.end_date = end;
        }
        if let Some(status) = status {
            self.status = status;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.status == MembershipStatus::Deleted
    }

    /// Soft-deletes the record.
    pub fn mark_deleted(&mut self) {
        self.status = MembershipStatus::Deleted;
        self.auto_renew = false;
        self.updated_at = Timestamp::now();
    }

    /// Picks "the" membership of a user: most recent end date among
    /// non-terminal statuses.
    pub fn select_current(memberships: &[Membership]) -> Option<&Membership> {
        memberships
            .iter()
            .filter(|m| !m.status.is_terminal())
            .max_by_key(|m| m.end_date)
    }
}

fn validate_window(start: &Timestamp, end: &Timestamp) -> Result<(), ValidationError> {
    if end.is_before(start) {
        return Err(ValidationError::invalid_format(
            "end_date",
            format!(
                "end date {} is before start date {}",
                end.date_string(),
                start.date_string()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn terms(status: MembershipStatus, end: i64) -> BillingTerms {
        BillingTerms {
            plan_type: PlanType::Individual,
            status,
            start_date: ts(1_000_000),
            end_date: ts(end),
            auto_renew: true,
        }
    }

    #[test]
    fn new_rejects_inverted_window() {
        let result = Membership::new(UserId::new(), None, terms(MembershipStatus::Active, 10));
        assert!(result.is_err());
    }

    #[test]
    fn apply_terms_reports_change_only_when_different() {
        let mut m = Membership::new(
            UserId::new(),
            Some("sub_1".into()),
            terms(MembershipStatus::Active, 2_000_000),
        )
        .unwrap();
        let id = m.id;

        assert!(!m.apply_terms(&terms(MembershipStatus::Active, 2_000_000)).unwrap());
        assert!(m.apply_terms(&terms(MembershipStatus::Canceled, 2_000_000)).unwrap());
        assert_eq!(m.status, MembershipStatus::Canceled);
        assert_eq!(m.id, id);
        assert_eq!(m.billing_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn apply_terms_leaves_deleted_record_alone() {
        let mut m = Membership::new(
            UserId::new(),
            Some("sub_1".into()),
            terms(MembershipStatus::Active, 2_000_000),
        )
        .unwrap();
        m.mark_deleted();
        let before = m.clone();

        assert!(!m.apply_terms(&terms(MembershipStatus::Canceled, 3_000_000)).unwrap());
        assert_eq!(m, before);
        assert!(m.is_deleted());
    }

    #[test]
    fn adjust_validates_end_date() {
        let mut m =
            Membership::new(UserId::new(), None, terms(MembershipStatus::Active, 2_000_000)).unwrap();
        assert!(m.adjust(Some(ts(5)), None).is_err());
        m.adjust(Some(ts(3_000_000)), Some(MembershipStatus::Complimentary))
            .unwrap();
        assert_eq!(m.end_date, ts(3_000_000));
        assert_eq!(m.status, MembershipStatus::Complimentary);
    }

    #[test]
    fn select_current_skips_terminal_records() {
        let user = UserId::new();
        let old = Membership::new(user, None, terms(MembershipStatus::Active, 2_000_000)).unwrap();
        let newer_canceled =
            Membership::new(user, None, terms(MembershipStatus::Canceled, 9_000_000)).unwrap();
        let list = vec![old.clone(), newer_canceled];

        assert_eq!(Membership::select_current(&list).map(|m| m.id), Some(old.id));
    }

    #[test]
    fn mark_deleted_stops_renewal() {
        let mut m =
            Membership::new(UserId::new(), None, terms(MembershipStatus::Active, 2_000_000)).unwrap();
        m.mark_deleted();
        assert_eq!(m.status, MembershipStatus::Deleted);
        assert!(!m.auto_renew);
    }
}
