//! Request and response documents for the mocked GitHub endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Scope granted to every issued token.
pub const GRANTED_SCOPE: &str = "repo,admin";

/// Token type reported by the token endpoint.
pub const TOKEN_TYPE: &str = "bearer";

/// Documentation link attached to API errors.
pub const DOCUMENTATION_URL: &str = "https://docs.github.com/enterprise-server@3.8/rest";

/// Message returned when a bearer credential is missing or invalid.
pub const UNAUTHORIZED_MESSAGE: &str = "Must authenticate to access this API.";

/// Fixed creation/update time of the mocked user.
pub const USER_TIMESTAMP: &str = "2008-01-14T04:33:35Z";

const USER_FIXTURE: &str = include_str!("fixtures/api_v3_user.json");

/// Query parameters of `GET /login/oauth/authorize`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Body of `POST /login/oauth/access_token`, form-encoded or JSON.
///
/// Absent fields decode as empty strings and fail the lookups that follow.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub code: String,
}

/// Successful token exchange response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub scope: String,
    pub token_type: String,
}

impl AccessTokenResponse {
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            scope: GRANTED_SCOPE.to_owned(),
            token_type: TOKEN_TYPE.to_owned(),
        }
    }
}

/// Error document in the shape GitHub's REST API uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubApiError {
    pub message: String,
    pub documentation_url: String,
}

impl GitHubApiError {
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::with_message(UNAUTHORIZED_MESSAGE)
    }

    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            documentation_url: DOCUMENTATION_URL.to_owned(),
        }
    }
}

/// Billing plan attached to the mocked user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubApiUserPlan {
    pub name: String,
    pub space: i64,
    pub private_repos: i64,
    pub collaborators: i64,
}

/// The authenticated user returned by `GET /api/v3/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubApiUser {
    pub login: String,
    pub id: i64,
    pub node_id: String,
    pub avatar_url: String,
    pub gravatar_id: String,
    pub url: String,
    pub html_url: String,
    pub followers_url: String,
    pub following_url: String,
    pub gists_url: String,
    pub starred_url: String,
    pub subscriptions_url: String,
    pub organizations_url: String,
    pub repos_url: String,
    pub events_url: String,
    pub received_events_url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub site_admin: bool,
    pub name: String,
    pub company: String,
    pub blog: String,
    pub location: String,
    pub email: String,
    pub hireable: bool,
    pub bio: String,
    pub twitter_username: String,
    pub public_repos: i64,
    pub public_gists: i64,
    pub followers: i64,
    pub following: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub private_gists: i64,
    pub total_private_repos: i64,
    pub owned_private_repos: i64,
    pub disk_usage: i64,
    pub collaborators: i64,
    pub two_factor_authentication: bool,
    pub plan: GitHubApiUserPlan,
}

impl GitHubApiUser {
    /// Decode the embedded user fixture and root its URLs at `base_url`.
    pub fn from_fixture(base_url: &Url) -> Result<Self, serde_json::Error> {
        let mut user: Self = serde_json::from_str(USER_FIXTURE)?;
        user.rebase(base_url);
        Ok(user)
    }

    fn rebase(&mut self, base_url: &Url) {
        // Paths are absolute, so they replace whatever path the base carries.
        let origin = base_url.origin().ascii_serialization();
        let at = |path: &str| format!("{origin}{path}");

        self.avatar_url = at("/images/error/octocat_happy.gif");
        self.url = at("/api/v3/users/octocat");
        self.html_url = at("/octocat");
        self.followers_url = at("/api/v3/users/octocat/followers");
        self.following_url = at("/api/v3/users/octocat/following{/other_user}");
        self.gists_url = at("/api/v3/users/octocat/gists{/gist_id}");
        self.starred_url = at("/api/v3/users/octocat/starred{/owner}{/repo}");
        self.subscriptions_url = at("/api/v3/users/octocat/subscriptions");
        self.organizations_url = at("/api/v3/users/octocat/orgs");
        self.repos_url = at("/api/v3/users/octocat/repos");
        self.events_url = at("/api/v3/users/octocat/events{/privacy}");
        self.received_events_url = at("/api/v3/users/octocat/received_events");

        if let Ok(ts) = DateTime::parse_from_rfc3339(USER_TIMESTAMP) {
            self.created_at = ts.with_timezone(&Utc);
            self.updated_at = self.created_at;
        }
    }
}
