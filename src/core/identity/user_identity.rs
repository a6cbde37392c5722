// User identity resolution.
//
// There is no login here: a "user" is whatever identifier the aggregation
// service has connected accounts under. We look for it in the identifier
// cookies first, then in whatever the caller sent explicitly, and as a last
// resort hand out a fresh random id so the caller can start connecting accounts.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;

/// Cookie set by this server (and by the sign-in flow for Sheets).
pub const SHEET_USER_COOKIE: &str = "googlesheet_user_id";

/// Cookie set by the sign-in flow for Docs.
pub const DOC_USER_COOKIE: &str = "googledoc_user_id";

const REQUEST_ID_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    /// True when the id was generated for this request. The HTTP layer
    /// persists it as a cookie in that case.
    pub newly_issued: bool,
}

impl UserIdentity {
    /// Resolves the user id or issues a new one.
    pub fn resolve_or_issue(
        sheet_cookie: Option<&str>,
        doc_cookie: Option<&str>,
        explicit: Option<&str>,
    ) -> Self {
        match resolve_user_id(sheet_cookie, doc_cookie, explicit) {
            Some(user_id) => Self {
                user_id,
                newly_issued: false,
            },
            None => Self {
                user_id: generate_user_id(),
                newly_issued: true,
            },
        }
    }
}

/// First non-empty of: sheet cookie, doc cookie, explicit value.
pub fn resolve_user_id(
    sheet_cookie: Option<&str>,
    doc_cookie: Option<&str>,
    explicit: Option<&str>,
) -> Option<String> {
    [sheet_cookie, doc_cookie, explicit]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Random 10-digit decimal id (never starts with 0).
pub fn generate_user_id() -> String {
    rand::thread_rng()
        .gen_range(1_000_000_000u64..=9_999_999_999u64)
        .to_string()
}

/// Short id used to correlate the log lines of one request.
pub fn generate_request_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LEN)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

/// Clients send `userId` either as a string or as a bare number.
pub fn user_id_from_json(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
