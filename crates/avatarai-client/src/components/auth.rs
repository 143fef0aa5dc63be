//! Sign-in, session restore and token refresh.
//!
//! The component owns the auth half of the session lifecycle: it adopts
//! stored credentials on start, completes the OAuth code exchange, keeps the
//! access token fresh and tears everything down on sign-out. Every path that
//! ends signed in opens the chat stream; every path that ends signed out
//! closes it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use avatarai_net::{ApiClient, SigninRedirect, StreamHandle};
use avatarai_shared::token::needs_refresh;
use avatarai_shared::{Session, User, ValidationError};

use crate::app::AppCommand;
use crate::error::{ClientError, Result};
use crate::events::{AuthView, EventSink, UiEvent};
use crate::state::Store;

#[derive(Clone)]
pub struct AuthComponent {
    session: Session,
    api: ApiClient,
    store: Store,
    stream: StreamHandle,
    events: EventSink,
    commands: mpsc::UnboundedSender<AppCommand>,
    refresh_interval: Duration,
    refresh_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AuthComponent {
    pub fn new(
        session: Session,
        api: ApiClient,
        store: Store,
        stream: StreamHandle,
        events: EventSink,
        commands: mpsc::UnboundedSender<AppCommand>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            session,
            api,
            store,
            stream,
            events,
            commands,
            refresh_interval,
            refresh_timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Restore the session from storage.
    pub async fn init(&self) -> Result<AuthView> {
        let (token, user) = self
            .store
            .with(|db| Ok((db.get_stored_token()?, db.get_stored_user()?)))?;

        match (token, user) {
            (Some(token), Some(mut user)) => {
                info!(did = %user.did, "Restoring stored session");
                user.normalize_media();
                self.session.sign_in(token, user);
                self.arm_refresh_timer();
                self.check_token_expiry(now_secs()).await?;
                if !self.session.is_active() {
                    // The proactive refresh failed and already signed out.
                    return Ok(AuthView::Welcome);
                }
                self.enter_signed_in().await
            }
            (Some(token), None) => {
                debug!("Stored token without user, fetching profile");
                self.session.set_access_token(token);
                self.fetch_current_user().await
            }
            _ => Ok(self.show(AuthView::Welcome)),
        }
    }

    pub fn show_login_form(&self) -> AuthView {
        self.show(AuthView::LoginForm)
    }

    /// Start the browser sign-in flow for `username`.
    pub async fn begin_signin(&self, username: &str) -> Result<AuthView> {
        let username = username.trim();
        if username.is_empty() {
            let err = ValidationError::Required("Username");
            self.events.warning(err.to_string());
            return Err(err.into());
        }

        match self.api.signin(username).await {
            Ok(SigninRedirect::Location(url)) => Ok(self.show(AuthView::Redirect(url))),
            Ok(SigninRedirect::None) => {
                self.events.info("Sign-in request sent, continue in your browser");
                Ok(self.show(AuthView::LoginForm))
            }
            Err(e) => {
                self.events.error(format!("Sign-in failed: {e}"));
                Err(e.into())
            }
        }
    }

    /// Finish sign-in with the code from the OAuth callback.
    pub async fn complete_oauth(&self, code: &str) -> Result<AuthView> {
        let response = match self.api.exchange_code(code).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Code exchange failed");
                self.events.error(format!("Sign-in failed: {e}"));
                return Ok(self.show(AuthView::Welcome));
            }
        };

        let Some(token) = response.access_token.clone() else {
            let reason = response.error.as_deref().unwrap_or("no access token in response");
            warn!(reason, "Code exchange returned no token");
            self.events.error(format!("Sign-in failed: {reason}"));
            return Ok(self.show(AuthView::Welcome));
        };

        let user = response.user();
        self.store.with(|db| {
            db.store_token(&token)?;
            if let Some(refresh) = &response.refresh_token {
                db.store_refresh_token(refresh)?;
            }
            if let Some(user) = &user {
                db.store_user(user)?;
            }
            Ok(())
        })?;

        self.session.set_access_token(token);
        if let Some(user) = user {
            self.session.set_user(user);
        }
        self.events.success("Signed in");
        self.fetch_current_user().await
    }

    /// Load the full profile for the current token. Any failure drops the
    /// session and returns to the welcome view.
    pub async fn fetch_current_user(&self) -> Result<AuthView> {
        match self.api.get_current_user().await {
            Ok(mut user) => {
                user.normalize_media();
                self.store.with(|db| db.store_user(&user))?;
                self.session.set_user(user);
                self.arm_refresh_timer();
                self.enter_signed_in().await
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch current user");
                self.events.error(format!("Failed to load your profile: {e}"));
                self.clear().await?;
                Ok(self.show(AuthView::Welcome))
            }
        }
    }

    /// Refresh proactively when the access token expires soon. Returns
    /// whether a refresh was attempted.
    pub async fn check_token_expiry(&self, now_secs: i64) -> Result<bool> {
        let refresh = self.store.with(|db| db.get_stored_refresh_token())?;
        let Some(token) = self.session.access_token() else {
            return Ok(false);
        };
        if refresh.is_none() || !needs_refresh(&token, now_secs) {
            return Ok(false);
        }
        info!("Access token close to expiry, refreshing");
        self.refresh_access_token().await?;
        Ok(true)
    }

    /// Exchange the stored refresh token for a new access token. Returns
    /// whether the session survived.
    pub async fn refresh_access_token(&self) -> Result<bool> {
        let Some(refresh) = self.store.with(|db| db.get_stored_refresh_token())? else {
            self.events.warning("No refresh token, please sign in again");
            self.clear().await?;
            self.show(AuthView::Welcome);
            return Ok(false);
        };

        let response = match self.api.refresh_token(&refresh).await {
            Ok(response) => response,
            Err(e) => return self.refresh_failed(&e.to_string()).await,
        };
        let Some(token) = response.access_token.clone() else {
            let reason = response.error.unwrap_or_else(|| "no access token in response".into());
            return self.refresh_failed(&reason).await;
        };

        let user = response.user();
        self.store.with(|db| {
            db.store_token(&token)?;
            if let Some(next) = &response.refresh_token {
                db.store_refresh_token(next)?;
            }
            if let Some(user) = &user {
                db.store_user(user)?;
            }
            Ok(())
        })?;

        self.session.set_access_token(token);
        if let Some(fresh) = user {
            self.session.update_user(|current| {
                current.did = fresh.did;
                current.handle = fresh.handle;
            });
        }
        self.arm_refresh_timer();
        info!("Access token refreshed");
        self.events.success("Access token refreshed");
        Ok(true)
    }

    async fn refresh_failed(&self, reason: &str) -> Result<bool> {
        warn!(reason, "Token refresh failed");
        self.events
            .error(format!("Token refresh failed, please sign in again: {reason}"));
        self.clear().await?;
        self.show(AuthView::Welcome);
        Ok(false)
    }

    /// Sign out. Backend errors are ignored; local state is always cleared.
    pub async fn logout(&self) -> Result<AuthView> {
        if let Err(e) = self.api.logout().await {
            debug!(error = %e, "Logout request failed, clearing locally");
        }
        self.clear().await?;
        self.events.success("Signed out");
        Ok(self.show(AuthView::Welcome))
    }

    /// Drop a session the backend rejected.
    pub async fn expire_session(&self) -> Result<AuthView> {
        warn!("Session rejected by the backend");
        self.events.warning("Session expired, please sign in again");
        self.clear().await?;
        Ok(self.show(AuthView::Welcome))
    }

    /// Forget the session, the stored credentials and the refresh timer, and
    /// close the stream.
    pub async fn clear(&self) -> Result<()> {
        self.cancel_refresh_timer();
        self.session.clear();
        self.store.with(|db| db.clear_stored_auth())?;
        self.stream.disconnect().await;
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    async fn enter_signed_in(&self) -> Result<AuthView> {
        let user = self.session.current_user().ok_or(ClientError::NotSignedIn)?;
        self.stream.connect().await;
        Ok(self.show(AuthView::UserPanel(user)))
    }

    fn show(&self, view: AuthView) -> AuthView {
        self.events.emit(UiEvent::Auth(view.clone()));
        view
    }

    /// (Re)start the periodic refresh. The timer only posts a command; the
    /// shell runs the refresh on its own loop.
    fn arm_refresh_timer(&self) {
        let period = self.refresh_interval;
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                if commands.send(AppCommand::RefreshToken).is_err() {
                    break;
                }
            }
        });

        let mut timer = self.refresh_timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.replace(task) {
            previous.abort();
        }
        debug!(interval_secs = period.as_secs(), "Token refresh timer armed");
    }

    fn cancel_refresh_timer(&self) {
        let mut timer = self.refresh_timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = timer.take() {
            task.abort();
        }
    }

    pub fn refresh_timer_armed(&self) -> bool {
        self.refresh_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
