//! Membership module - users, memberships, cards and the audit trail.
//!
//! # Module Structure
//!
//! - `user` - Club member identity
//! - `aggregate` - Membership record and its billing terms
//! - `status` / `plan` - Membership enums
//! - `card` - Membership card projection and membership numbers
//! - `audit` - Append-only audit entries
//! - `errors` - Engine error taxonomy

mod aggregate;
mod audit;
mod card;
mod errors;
mod plan;
mod status;
mod user;

pub use aggregate::{BillingTerms, Membership};
pub use audit::{AuditAction, AuditLogEntry};
pub use card::{CardVerification, MembershipCard, MembershipNumber};
pub use errors::{EngineError, NO_CHANGES};
pub use plan::PlanType;
pub use status::MembershipStatus;
pub use user::{normalize_email, User};
