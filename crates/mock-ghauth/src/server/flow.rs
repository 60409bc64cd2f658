//! The authorization-code flow, independent of the HTTP layer.
//!
//! A login attempt moves through `REQUESTED → CODE_ISSUED → TOKEN_ISSUED →
//! AUTHENTICATED`. No state object is kept: the state is which store currently
//! holds the attempt's key.

use axum::http::HeaderValue;
use chrono::Utc;
use url::Url;

use super::types::{AccessTokenResponse, AuthorizeQuery, GitHubApiUser, TokenRequest};
use crate::error::{ApiError, ApiResult};
use crate::store::{ClientRegistry, CodeStore, TokenStore};

/// Orchestrates authorize, token exchange and authenticated-user lookups.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    clients: ClientRegistry,
    codes: CodeStore,
    tokens: TokenStore,
    base_url: Url,
}

impl OAuthFlow {
    #[must_use]
    pub fn new(
        clients: ClientRegistry,
        codes: CodeStore,
        tokens: TokenStore,
        base_url: Url,
    ) -> Self {
        Self {
            clients,
            codes,
            tokens,
            base_url,
        }
    }

    /// Same stores, with user profile URLs rooted at `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Validate an authorize request and issue a code.
    ///
    /// Returns the redirect location carrying the code.
    pub async fn authorize(&self, query: &AuthorizeQuery) -> ApiResult<String> {
        let Some(client_id) = non_empty(query.client_id.as_deref()) else {
            return Err(ApiError::Unauthorized);
        };
        if !self.clients.exists(client_id).await {
            return Err(ApiError::Unauthorized);
        }

        let Some(redirect_uri) = non_empty(query.redirect_uri.as_deref()) else {
            return Err(ApiError::bad_request("Missing redirect_uri"));
        };
        // Codes are hex, so a valid redirect stays a valid Location header
        if HeaderValue::from_str(redirect_uri).is_err() {
            return Err(ApiError::bad_request("Invalid redirect_uri"));
        }

        let code = self.codes.issue().await;
        tracing::info!(client_id = %client_id, "Issued authorization code");

        Ok(redirect_location(redirect_uri, &code))
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The client secret is accepted but never checked. The code is consumed.
    pub async fn exchange(&self, req: &TokenRequest) -> ApiResult<AccessTokenResponse> {
        if !self.clients.exists(&req.client_id).await {
            return Err(ApiError::not_found("client"));
        }

        if self.codes.redeem(&req.code).await.is_none() {
            return Err(ApiError::not_found("code"));
        }

        let token = self.tokens.issue().await;
        tracing::info!(client_id = %req.client_id, "Issued access token");

        Ok(AccessTokenResponse::bearer(token))
    }

    /// Resolve the user behind an `Authorization` header value.
    pub async fn authenticated_user(
        &self,
        authorization: Option<&str>,
    ) -> ApiResult<GitHubApiUser> {
        let token = authorization
            .and_then(bearer_credential)
            .ok_or(ApiError::Authentication)?;

        if !self.tokens.is_live(token, Utc::now()).await {
            return Err(ApiError::Authentication);
        }

        GitHubApiUser::from_fixture(&self.base_url)
            .map_err(ApiError::fixture)
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Extract the credential from a `<scheme> <value>` header.
///
/// Any scheme is accepted; the header must hold exactly two
/// whitespace-separated parts.
#[must_use]
pub fn bearer_credential(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    let (_scheme, value) = (parts.next()?, parts.next()?);

    if parts.next().is_some() {
        return None;
    }
    Some(value)
}

/// Append `code` to the redirect URI's query string.
fn redirect_location(redirect_uri: &str, code: &str) -> String {
    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    format!("{redirect_uri}{separator}code={code}")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIRECT_URI: &str = "https://example.test/cb";

    async fn flow() -> OAuthFlow {
        let clients = ClientRegistry::new();
        clients.register("client", "secret").await;
        OAuthFlow::new(
            clients,
            CodeStore::new(),
            TokenStore::new(),
            Url::parse("http://mock.test:8080").unwrap(),
        )
    }

    fn query(client_id: Option<&str>, redirect_uri: Option<&str>) -> AuthorizeQuery {
        AuthorizeQuery {
            client_id: client_id.map(str::to_owned),
            redirect_uri: redirect_uri.map(str::to_owned),
        }
    }

    #[test]
    fn test_bearer_credential() {
        assert_eq!(bearer_credential("Bearer ght_abc"), Some("ght_abc"));
        assert_eq!(bearer_credential("token ght_abc"), Some("ght_abc"));
        assert_eq!(bearer_credential("Bearer\tght_abc"), Some("ght_abc"));
        assert_eq!(bearer_credential("ght_abc"), None);
        assert_eq!(bearer_credential("Bearer "), None);
        assert_eq!(bearer_credential(""), None);
        assert_eq!(bearer_credential("Bearer a b"), None);
    }

    #[test]
    fn test_redirect_location() {
        assert_eq!(
            redirect_location(REDIRECT_URI, "c1"),
            "https://example.test/cb?code=c1"
        );
        assert_eq!(
            redirect_location("https://example.test/cb?state=x", "c1"),
            "https://example.test/cb?state=x&code=c1"
        );
    }

    #[tokio::test]
    async fn test_authorize_unknown_client_short_circuits() {
        let flow = flow().await;

        let unknown = query(Some("foo"), Some(REDIRECT_URI));
        let err = flow.authorize(&unknown).await;
        assert!(matches!(err, Err(ApiError::Unauthorized)));

        // A missing redirect is not reported once the client is rejected
        let err = flow.authorize(&query(None, None)).await;
        assert!(matches!(err, Err(ApiError::Unauthorized)));
        assert!(flow.codes.is_empty().await);
    }

    #[tokio::test]
    async fn test_authorize_missing_redirect() {
        let flow = flow().await;
        let err = flow.authorize(&query(Some("client"), None)).await;
        assert!(matches!(err, Err(ApiError::BadRequest { .. })));
        assert!(flow.codes.is_empty().await);
    }

    #[tokio::test]
    async fn test_authorize_rejects_control_characters_in_redirect() {
        let flow = flow().await;

        for redirect_uri in [
            "https://example.test/cb\n",
            "https://example.test/\r\nX-Evil: 1",
        ] {
            let bad = query(Some("client"), Some(redirect_uri));
            let err = flow.authorize(&bad).await;
            assert!(matches!(err, Err(ApiError::BadRequest { .. })));
        }
        assert!(flow.codes.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_flow() {
        let flow = flow().await;

        let location = flow
            .authorize(&query(Some("client"), Some(REDIRECT_URI)))
            .await
            .unwrap();
        let code = location
            .strip_prefix("https://example.test/cb?code=")
            .unwrap()
            .to_owned();
        assert!(flow.codes.exists(&code).await);

        let req = TokenRequest {
            client_id: "client".into(),
            client_secret: "wrong".into(),
            code,
        };
        let resp = flow.exchange(&req).await.unwrap();
        assert!(resp.access_token.starts_with("ght_"));

        let header = format!("Bearer {}", resp.access_token);
        let user = flow.authenticated_user(Some(&header)).await.unwrap();
        assert_eq!(user.login, "octocat");
        assert!(user.url.starts_with("http://mock.test:8080/"));

        // Codes are single use
        assert!(matches!(
            flow.exchange(&req).await,
            Err(ApiError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_with_base_url_rebases_profile() {
        let base_url = Url::parse("http://127.0.0.1:43123").unwrap();
        let flow = flow().await.with_base_url(base_url);
        let token = flow.tokens.issue().await;

        let header = format!("token {token}");
        let user = flow.authenticated_user(Some(&header)).await.unwrap();
        assert_eq!(user.html_url, "http://127.0.0.1:43123/octocat");
        assert_eq!(flow.base_url().port(), Some(43123));
    }

    #[tokio::test]
    async fn test_exchange_unknown_client() {
        let flow = flow().await;
        let code = flow.codes.issue().await;

        let req = TokenRequest {
            client_id: "nobody".into(),
            code: code.clone(),
            ..TokenRequest::default()
        };
        assert!(matches!(
            flow.exchange(&req).await,
            Err(ApiError::NotFound { .. })
        ));

        // The code survives a rejected client
        assert!(flow.codes.exists(&code).await);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let flow = flow().await;
        flow.tokens
            .configure_lifetime(std::time::Duration::ZERO)
            .await;
        let token = flow.tokens.issue().await;

        let header = format!("Bearer {token}");
        let err = flow.authenticated_user(Some(&header)).await;
        assert!(matches!(err, Err(ApiError::Authentication)));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let flow = flow().await;
        assert!(matches!(
            flow.authenticated_user(None).await,
            Err(ApiError::Authentication)
        ));
    }
}
