use avatarai_shared::Session;

/// Source of the bearer token for outbound requests and the stream upgrade.
pub trait Credentials: Send + Sync {
    fn access_token(&self) -> Option<String>;

    /// Whether a signed-in user is present. The stream only connects, and
    /// only reconnects, while this holds.
    fn is_active(&self) -> bool {
        self.access_token().is_some()
    }
}

impl Credentials for Session {
    fn access_token(&self) -> Option<String> {
        Session::access_token(self)
    }

    fn is_active(&self) -> bool {
        Session::is_active(self)
    }
}

/// Fixed credentials, for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl Credentials for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}
