//! Admin operations: authorization, member administration, refunds and
//! operator-triggered reconciliation.

mod authorizer;
mod commands;
mod service;

pub use authorizer::{
    admin_authorizer, AdminPrincipal, AllowListAuthorizer, Authorizer, SessionClaimAuthorizer,
};
pub use commands::{
    AdjustMembership, DeleteMember, DeletionOutcome, ImportRow, ImportRowError, ImportSummary,
    IssueRefund, MemberDetails, MemberPage, MemberSummary, MAX_AUDIT_ENTRIES, MAX_PAGE_SIZE,
};
pub use service::{AdminMembershipService, AdminSettings};
