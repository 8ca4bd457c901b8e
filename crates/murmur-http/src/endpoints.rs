//! API paths and wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use murmur_core::{Collection, RecordId};

/// Collection holding user accounts.
pub const USERS: &str = "users";

pub fn records(collection: &Collection) -> String {
    format!("collections/{}/records", collection)
}

pub fn record(collection: &Collection, id: &RecordId) -> String {
    format!("collections/{}/records/{}", collection, id)
}

pub fn auth_with_password() -> String {
    format!("collections/{}/auth-with-password", USERS)
}

pub fn auth_refresh() -> String {
    format!("collections/{}/auth-refresh", USERS)
}

pub fn create_user() -> String {
    format!("collections/{}/records", USERS)
}

/// Request for password auth.
#[derive(Debug, Clone, Serialize)]
pub struct AuthWithPasswordRequest<'a> {
    pub identity: &'a str,
    pub password: &'a str,
}

/// Response from password auth and token refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub record: AuthRecord,
}

/// The user record returned next to a token.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthRecord {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Request to create a user account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    pub password: &'a str,
    pub password_confirm: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Query parameters of a list request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
}

/// Query parameters of a single-record request.
#[derive(Debug, Clone, Serialize)]
pub struct GetParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
}

/// One page of records.
///
/// `totalItems` is `-1` when the request asked the store to skip counting.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub total_items: Option<i64>,
    #[serde(default)]
    pub items: Vec<Value>,
}

/// Error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, alias = "status")]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}
