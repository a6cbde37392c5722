use super::cookies::{read_cookie, user_id_cookie};
use super::AppState;
use crate::core::agent::{classify_failure, SuperAgentRequest};
use crate::core::identity::{
    generate_request_id, resolve_user_id, user_id_from_json, UserIdentity, DOC_USER_COOKIE,
    SHEET_USER_COOKIE,
};
use crate::core::presentations::{ExportError, ExportRequest};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const SIGNIN_SUGGESTION: &str = "Visit /signin to connect your Google Slides account.";
const NOT_CONNECTED_ERROR: &str =
    "Your Google account is not connected. Please sign in to create Google Slides.";

fn json_reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// Attaches the user id cookie when the id was issued for this request.
fn with_identity_cookie(mut response: Response, identity: &UserIdentity, secure: bool) -> Response {
    if !identity.newly_issued {
        return response;
    }
    let cookie = user_id_cookie(SHEET_USER_COOKIE, &identity.user_id, secure);
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Could not build Set-Cookie header: {}", e),
    }
    response
}

/// Cookies first, then whatever the body carried; a fresh id otherwise.
fn identify(headers: &HeaderMap, body_user_id: Option<&Value>) -> UserIdentity {
    let sheet = read_cookie(headers, SHEET_USER_COOKIE);
    let doc = read_cookie(headers, DOC_USER_COOKIE);
    let explicit = user_id_from_json(body_user_id);
    UserIdentity::resolve_or_issue(sheet.as_deref(), doc.as_deref(), explicit.as_deref())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "environment": state.config.environment,
        "hasComposioKey": state.config.has_composio_key(),
        "hasGoogleKey": state.config.has_gemini_key(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectionsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub async fn check_connections(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectionsQuery>,
    headers: HeaderMap,
) -> Response {
    let request_id = generate_request_id();
    let sheet = read_cookie(&headers, SHEET_USER_COOKIE);
    let doc = read_cookie(&headers, DOC_USER_COOKIE);
    let user_id = query
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| resolve_user_id(sheet.as_deref(), doc.as_deref(), None));

    let Some(user_id) = user_id else {
        return json_reply(
            StatusCode::BAD_REQUEST,
            json!({
                "error": "No userId provided. Please provide userId as query parameter or ensure you have a cookie set.",
                "suggestion": "Visit /signin to connect your accounts first.",
            }),
        );
    };

    let report = state.connections.check(&user_id, &request_id).await;
    (StatusCode::OK, Json(report)).into_response()
}

pub async fn superagent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = generate_request_id();

    let request: SuperAgentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, "Failed to parse request body: {}", e);
            return json_reply(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request body. Please check your input." }),
            );
        }
    };

    if request.prompt.as_deref().map_or(true, str::is_empty) {
        return json_reply(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Prompt is required." }),
        );
    }

    if !state.config.has_gemini_key() {
        tracing::error!(request_id = %request_id, "GOOGLE_GENERATIVE_AI_API_KEY is not set");
        return json_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "Missing GOOGLE_GENERATIVE_AI_API_KEY environment variable. Please set it in your server environment.",
                "requestId": request_id,
            }),
        );
    }
    if !state.config.has_composio_key() {
        tracing::error!(request_id = %request_id, "COMPOSIO_API_KEY is not set");
        return json_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "error": "Missing COMPOSIO_API_KEY environment variable. Please set it in your server environment.",
                "requestId": request_id,
            }),
        );
    }

    let identity = identify(&headers, request.user_id.as_ref());
    if identity.newly_issued {
        tracing::info!(request_id = %request_id, user_id = %identity.user_id, "Issued new user id");
    }

    let response = match state
        .superagent
        .handle(&request, &identity.user_id, &request_id)
        .await
    {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id, status = ?e.status(), "SuperAgent request failed: {}", e);
            let report = classify_failure(e.status(), &e.to_string(), state.config.is_development());
            let status =
                StatusCode::from_u16(report.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            json_reply(
                status,
                json!({
                    "error": report.error,
                    "details": report.details,
                    "requestId": request_id,
                }),
            )
        }
    };

    with_identity_cookie(response, &identity, state.config.is_production())
}

/// JSON body for a failed export.
fn export_error_body(error: &ExportError, user_id: &str, request_id: &str) -> Value {
    match error {
        ExportError::NoSlides => json!({ "error": error.to_string() }),
        ExportError::NotConnected {
            details,
            has_connected_account,
        } => {
            let mut body = json!({
                "error": NOT_CONNECTED_ERROR,
                "details": details,
                "suggestion": SIGNIN_SUGGESTION,
                "userId": user_id,
            });
            if let Some(has) = has_connected_account {
                body["hasConnectedAccount"] = json!(has);
            }
            body
        }
        ExportError::ToolsUnavailable {
            details,
            has_connected_account,
        } => json!({
            "error": "Failed to access Google Slides tools. Please check your Google account connection.",
            "details": details,
            "suggestion": "Visit /signin to connect your Google Slides account, or try again later.",
            "requestId": request_id,
            "hasConnectedAccount": has_connected_account,
        }),
        ExportError::CreateToolMissing { available_tools } => json!({
            "error": "Google Slides creation tool not available. Please check your Google account connection.",
            "availableTools": available_tools,
            "suggestion": SIGNIN_SUGGESTION,
            "requestId": request_id,
        }),
        other => json!({
            "error": "Failed to create Google Slides presentation.",
            "details": other.to_string(),
            "requestId": request_id,
        }),
    }
}

pub async fn create_google_slides(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = generate_request_id();

    let request: ExportRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, "Failed to parse request body: {}", e);
            return json_reply(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request body. Please check your input." }),
            );
        }
    };

    if !request.has_slides() {
        let error = ExportError::NoSlides;
        return json_reply(StatusCode::BAD_REQUEST, export_error_body(&error, "", &request_id));
    }

    let identity = identify(&headers, request.user_id.as_ref());

    let response = match state
        .slides_export
        .create(&request, &identity.user_id, &request_id)
        .await
    {
        Ok(outcome) => json_reply(
            StatusCode::OK,
            json!({
                "success": true,
                "presentationId": outcome.presentation_id,
                "slidesUrl": outcome.slides_url,
                "message": outcome.message,
                "requestId": request_id,
            }),
        ),
        Err(e) => {
            tracing::error!(request_id = %request_id, "Create Google Slides failed: {}", e);
            let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            json_reply(status, export_error_body(&e, &identity.user_id, &request_id))
        }
    };

    with_identity_cookie(response, &identity, state.config.is_production())
}
