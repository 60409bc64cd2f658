//! HTTP endpoint handlers.
//!
//! Implements the three GitHub endpoints an OAuth client touches:
//! - `GET /login/oauth/authorize`
//! - `POST /login/oauth/access_token`
//! - `GET /api/v3/user`

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use super::HttpState;
use super::types::{AccessTokenResponse, AuthorizeQuery, GitHubApiUser, TokenRequest};
use crate::error::{ApiError, ApiResult};

// ─── Authorization Endpoint ──────────────────────────────────────────────────

/// `GET /login/oauth/authorize`
///
/// Auto-approves any registered client and redirects back with a code.
pub async fn handle_authorize(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<AuthorizeQuery>,
) -> ApiResult<Response> {
    let location = state.flow.authorize(&query).await?;

    let headers = [(header::LOCATION, location)];
    Ok((StatusCode::FOUND, headers).into_response())
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// `POST /login/oauth/access_token`
///
/// Exchange an authorization code for a bearer token.
pub async fn handle_access_token(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AccessTokenResponse>> {
    let req = decode_token_request(&headers, &body)?;
    let resp = state.flow.exchange(&req).await?;

    Ok(Json(resp))
}

/// Decode the token request as JSON or, by default, as a urlencoded form.
///
/// The media type is matched case-insensitively. Multipart bodies are rejected
/// rather than misread as an empty form.
pub fn decode_token_request(headers: &HeaderMap, body: &[u8]) -> ApiResult<TokenRequest> {
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map_or("", str::trim);

    if media_type.eq_ignore_ascii_case("application/json") {
        serde_json::from_slice(body)
            .map_err(|e| ApiError::malformed_body(e.to_string()))
    } else if media_type.eq_ignore_ascii_case("multipart/form-data") {
        Err(ApiError::malformed_body("multipart/form-data is not supported"))
    } else {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| ApiError::malformed_body(e.to_string()))
    }
}

// ─── API ─────────────────────────────────────────────────────────────────────

/// `GET /api/v3/user`
///
/// Return the mocked user for a live bearer token.
pub async fn handle_user(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
) -> ApiResult<Json<GitHubApiUser>> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let user = state.flow.authenticated_user(authorization).await?;

    Ok(Json(user))
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mock-ghauth",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
