use reqwest::header::LOCATION;
use reqwest::Method;
use serde_json::json;
use tracing::info;

use avatarai_shared::types::TokenResponse;

use super::ApiClient;
use crate::error::Result;

/// Where the browser-style sign-in flow continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigninRedirect {
    /// The server redirected to an authorization page.
    Location(String),
    /// The server answered directly without a redirect.
    None,
}

impl ApiClient {
    /// `POST /api/oauth/token`: exchange an OAuth callback code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.post_json("/api/oauth/token", &json!({ "code": code })).await
    }

    /// `POST /api/oauth/signin?platform=web` with the user's handle.
    pub async fn signin(&self, username: &str) -> Result<SigninRedirect> {
        let builder = self
            .request(Method::POST, "/api/oauth/signin")
            .query(&[("platform", "web")])
            .form(&[("username", username)]);
        let response = self.send(builder).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|loc| {
                if loc.starts_with('/') {
                    self.url(loc)
                } else {
                    loc.to_string()
                }
            });

        Ok(match location {
            Some(url) => {
                info!(url = %url, "Sign-in redirect");
                SigninRedirect::Location(url)
            }
            None => SigninRedirect::None,
        })
    }

    /// `POST /api/oauth/refresh`.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.post_json("/api/oauth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    /// `GET /api/oauth/logout`.
    pub async fn logout(&self) -> Result<()> {
        self.send(self.request(Method::GET, "/api/oauth/logout"))
            .await?;
        Ok(())
    }
}
