//! Request bodies and query strings for the admin API.
//!
//! Responses reuse the application types, which are `Serialize`.

use serde::{Deserialize, Serialize};

use crate::application::admin::ImportRow;
use crate::domain::foundation::UserId;

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    25
}

fn default_audit_limit() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailParams {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditParams {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default = "default_audit_limit")]
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}
