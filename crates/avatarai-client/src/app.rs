//! Application shell.
//!
//! [`App`] owns the session and builds everything else from it in
//! dependency order: storage, session, HTTP client, stream transport,
//! dispatcher, then the components. A single loop consumes stream
//! notifications and [`AppCommand`]s, so component operations never run
//! concurrently with each other.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use avatarai_net::{
    spawn_stream, ApiClient, Credentials, Dispatcher, StreamHandle, StreamNotification,
};
use avatarai_shared::mcp::InstallForm;
use avatarai_shared::validate::MediaKind;
use avatarai_shared::Session;

use crate::components::auth::AuthComponent;
use crate::components::chat::ChatComponent;
use crate::components::feed::FeedComponent;
use crate::components::mcp::McpManager;
use crate::components::post::PostComposer;
use crate::components::profile::ProfileEditor;
use crate::components::thread::ThreadView;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{AuthView, EventSink};
use crate::media::MediaFile;
use crate::state::Store;

/// Work items for the shell loop: user actions and timer ticks.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Periodic token refresh tick.
    RefreshToken,
    ShowLogin,
    Login { username: String },
    OAuthCode(String),
    Logout,
    SendText(String),
    SendImage(PathBuf),
    Interrupt,
    LoadHistory,
    LoadFeed,
    LoadMore,
    AttachImages(Vec<PathBuf>),
    AttachVideo(PathBuf),
    AttachLink(String),
    ClearAttachments,
    Post(String),
    ToggleReply(String),
    Reply { moment_id: String, text: String },
    OpenThread(String),
    EditProfile,
    StageAvatar(PathBuf),
    StageBanner(PathBuf),
    SaveProfile { display_name: String, description: String },
    McpList,
    McpDetail(String),
    McpAuthorize(String),
    McpToggle { mcp_id: String, enabled: bool },
    McpSync { mcp_id: String, sync: bool },
    McpUninstall(String),
    McpInstall(InstallForm),
    Shutdown,
}

/// Receiving ends consumed by [`App::run`].
pub struct AppInbox {
    notifications: mpsc::UnboundedReceiver<StreamNotification>,
    commands: mpsc::UnboundedReceiver<AppCommand>,
}

pub struct App {
    session: Session,
    stream: StreamHandle,
    dispatcher: Dispatcher,
    events: EventSink,
    commands: mpsc::UnboundedSender<AppCommand>,
    pub auth: AuthComponent,
    pub chat: ChatComponent,
    pub post: PostComposer,
    pub feed: FeedComponent,
    pub thread: ThreadView,
    pub profile: ProfileEditor,
    pub mcp: McpManager,
}

impl App {
    /// Build the shell with the database from `config.data_dir`.
    pub fn new(config: &ClientConfig, events: EventSink) -> Result<(Self, AppInbox)> {
        let store = Store::open(config.data_dir.as_deref())?;
        Self::with_store(config, store, events)
    }

    pub fn with_store(
        config: &ClientConfig,
        store: Store,
        events: EventSink,
    ) -> Result<(Self, AppInbox)> {
        let session = Session::new();
        let credentials: Arc<dyn Credentials> = Arc::new(session.clone());
        let api = ApiClient::new(config.base_url.clone(), config.http_timeout, credentials.clone())?;
        let (stream, notifications) = spawn_stream(config.stream_config(), credentials);
        let mut dispatcher = Dispatcher::new();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let auth = AuthComponent::new(
            session.clone(),
            api.clone(),
            store.clone(),
            stream.clone(),
            events.clone(),
            commands.clone(),
            config.token_refresh_interval,
        );
        let chat = ChatComponent::new(session.clone(), api.clone(), stream.clone(), events.clone());
        chat.subscribe(&mut dispatcher);
        let post = PostComposer::new(api.clone(), events.clone());
        let feed = FeedComponent::new(api.clone(), events.clone());
        let thread = ThreadView::new(api.clone(), events.clone());
        let profile = ProfileEditor::new(session.clone(), api.clone(), store, events.clone());
        let mcp = McpManager::new(api, events.clone());

        info!(base_url = %config.base_url, "Application shell ready");
        let app = Self {
            session,
            stream,
            dispatcher,
            events,
            commands,
            auth,
            chat,
            post,
            feed,
            thread,
            profile,
            mcp,
        };
        let inbox = AppInbox {
            notifications,
            commands: command_rx,
        };
        Ok((app, inbox))
    }

    /// Sender for user commands.
    pub fn commands(&self) -> mpsc::UnboundedSender<AppCommand> {
        self.commands.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Restore the stored session and load the signed-in views.
    pub async fn start(&self) -> Result<AuthView> {
        let view = self.auth.init().await?;
        self.after_auth(&view).await;
        Ok(view)
    }

    /// Run until [`AppCommand::Shutdown`], the command channel closes or
    /// Ctrl-C.
    pub async fn run(self, mut inbox: AppInbox) -> Result<()> {
        info!("Shell loop started");
        loop {
            tokio::select! {
                Some(notification) = inbox.notifications.recv() => {
                    self.handle_notification(notification);
                }
                command = inbox.commands.recv() => match command {
                    Some(AppCommand::Shutdown) | None => break,
                    Some(command) => self.execute(command).await,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        self.stream.shutdown().await;
        info!("Shell loop stopped");
        Ok(())
    }

    pub fn handle_notification(&self, notification: StreamNotification) {
        match notification {
            StreamNotification::Status(status) => self.chat.on_connection(status),
            StreamNotification::Frame(frame) => {
                if self.dispatcher.dispatch(&frame) == 0 {
                    debug!(event_type = %frame.event_type, "No subscriber for frame");
                }
            }
            StreamNotification::Closed { code } => info!(code, "Chat stream closed"),
            StreamNotification::ReconnectScheduled { delay } => {
                info!(delay_ms = delay.as_millis() as u64, "Chat stream reconnect scheduled");
            }
        }
    }

    /// Run one command. Failures were already shown by the component; the
    /// shell only reacts to lost credentials.
    pub async fn execute(&self, command: AppCommand) {
        debug!(?command, "Executing command");
        if let Err(e) = self.dispatch_command(command).await {
            self.handle_failure(e).await;
        }
    }

    async fn dispatch_command(&self, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::RefreshToken => {
                self.auth.refresh_access_token().await?;
            }
            AppCommand::ShowLogin => {
                self.auth.show_login_form();
            }
            AppCommand::Login { username } => {
                self.auth.begin_signin(&username).await?;
            }
            AppCommand::OAuthCode(code) => {
                let view = self.auth.complete_oauth(&code).await?;
                self.after_auth(&view).await;
            }
            AppCommand::Logout => {
                self.auth.logout().await?;
            }
            AppCommand::SendText(text) => {
                self.chat.send_text(&text).await?;
            }
            AppCommand::SendImage(path) => {
                let file = self.pick_media(&path, MediaKind::Image).await?;
                self.chat.send_image(file).await?;
            }
            AppCommand::Interrupt => {
                if !self.chat.interrupt().await {
                    self.events.info("Nothing to interrupt");
                }
            }
            AppCommand::LoadHistory => {
                self.chat.load_history().await?;
            }
            AppCommand::LoadFeed => {
                self.feed.load_feed(true).await?;
            }
            AppCommand::LoadMore => {
                self.feed.load_more().await?;
            }
            AppCommand::AttachImages(paths) => {
                let mut files = Vec::with_capacity(paths.len());
                for path in &paths {
                    match self.pick_media(path, MediaKind::Image).await {
                        Ok(file) => files.push(file),
                        // Already reported; the remaining files are still staged.
                        Err(ClientError::Validation(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                if !files.is_empty() {
                    self.post.add_images(files).await?;
                }
            }
            AppCommand::AttachVideo(path) => {
                let file = self.pick_media(&path, MediaKind::Video).await?;
                self.post.set_video(file).await?;
            }
            AppCommand::AttachLink(url) => self.post.set_external(&url)?,
            AppCommand::ClearAttachments => self.post.clear_media(),
            AppCommand::Post(text) => {
                if self.post.submit(&text).await? {
                    self.feed.load_feed(true).await?;
                }
            }
            AppCommand::ToggleReply(moment_id) => {
                self.feed.toggle_reply(&moment_id);
            }
            AppCommand::Reply { moment_id, text } => {
                self.feed.submit_reply(&moment_id, &text).await?;
            }
            AppCommand::OpenThread(uri) => {
                self.thread.open_thread(&uri).await?;
            }
            AppCommand::EditProfile => {
                self.profile.open()?;
            }
            AppCommand::StageAvatar(path) => {
                let file = self.pick_media(&path, MediaKind::Avatar).await?;
                self.profile.stage_avatar(file).await?;
            }
            AppCommand::StageBanner(path) => {
                let file = self.pick_media(&path, MediaKind::Banner).await?;
                self.profile.stage_banner(file).await?;
            }
            AppCommand::SaveProfile {
                display_name,
                description,
            } => {
                self.profile.submit(&display_name, &description).await?;
            }
            AppCommand::McpList => {
                self.mcp.list().await?;
            }
            AppCommand::McpDetail(id) => {
                self.mcp.detail(&id).await?;
            }
            AppCommand::McpAuthorize(id) => {
                self.mcp.authorize(&id).await?;
            }
            AppCommand::McpToggle { mcp_id, enabled } => {
                self.mcp.toggle_enabled(&mcp_id, enabled).await?;
            }
            AppCommand::McpSync { mcp_id, sync } => {
                self.mcp.toggle_sync(&mcp_id, sync).await?;
            }
            AppCommand::McpUninstall(id) => self.mcp.uninstall(&id).await?,
            AppCommand::McpInstall(form) => self.mcp.install(form).await?,
            AppCommand::Shutdown => {}
        }
        Ok(())
    }

    /// Load a picked file, reporting type and size rejections to the user.
    async fn pick_media(&self, path: &Path, kind: MediaKind) -> Result<MediaFile> {
        MediaFile::load(path, kind).await.map_err(|e| {
            if let ClientError::Validation(v) = &e {
                self.events.error(v.to_string());
            }
            e
        })
    }

    async fn handle_failure(&self, error: ClientError) {
        match &error {
            ClientError::NotSignedIn => {
                self.events.warning("Please sign in first");
            }
            e if e.is_auth_failure() => {
                if let Err(e) = self.auth.expire_session().await {
                    warn!(error = %e, "Failed to clear rejected session");
                }
            }
            ClientError::Io(e) => {
                self.events.error(format!("Cannot read file: {e}"));
            }
            e => debug!(error = %e, "Command failed"),
        }
    }

    /// Views that load once the user panel shows.
    async fn after_auth(&self, view: &AuthView) {
        if !matches!(view, AuthView::UserPanel(_)) {
            return;
        }
        if let Err(e) = self.chat.load_history().await {
            self.handle_failure(e).await;
        }
        if !self.session.is_active() {
            return;
        }
        if let Err(e) = self.feed.load_feed(true).await {
            self.handle_failure(e).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_support::{drain, toasts};
    use crate::events::{ToastLevel, UiEvent};
    use avatarai_shared::User;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ClientConfig {
        ClientConfig {
            base_url: server.uri(),
            reconnect_delay: Duration::from_secs(60),
            ..ClientConfig::default()
        }
    }

    fn stored_session(store: &Store) {
        store
            .with(|db| {
                db.store_token("tok")?;
                db.store_refresh_token("refresh")?;
                db.store_user(&User::from_identity("did:plc:me", "me.test"))
            })
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_start_shows_welcome() {
        let server = MockServer::start().await;
        let (events, mut rx) = EventSink::channel();
        let (app, _inbox) = App::with_store(&config(&server), Store::in_memory().unwrap(), events).unwrap();

        assert_eq!(app.start().await.unwrap(), AuthView::Welcome);
        assert!(drain(&mut rx).contains(&UiEvent::Auth(AuthView::Welcome)));
    }

    #[tokio::test]
    async fn signed_in_start_loads_history_and_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/feeds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed": []})))
            .expect(1)
            .mount(&server)
            .await;
        let store = Store::in_memory().unwrap();
        stored_session(&store);
        let (events, _rx) = EventSink::channel();
        let (app, _inbox) = App::with_store(&config(&server), store, events).unwrap();

        assert!(matches!(app.start().await.unwrap(), AuthView::UserPanel(_)));
        assert!(app.session().is_active());
    }

    #[tokio::test]
    async fn rejected_token_clears_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/messages/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"messages": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/feeds"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "token expired"})))
            .mount(&server)
            .await;
        let store = Store::in_memory().unwrap();
        stored_session(&store);
        let (events, mut rx) = EventSink::channel();
        let (app, _inbox) = App::with_store(&config(&server), store.clone(), events).unwrap();

        app.start().await.unwrap();
        assert!(!app.session().is_active());
        assert_eq!(store.with(|db| db.get_stored_token()).unwrap(), None);

        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&UiEvent::Auth(AuthView::Welcome)));
        assert!(toasts(&events).contains(&(
            ToastLevel::Warning,
            "Session expired, please sign in again".to_string()
        )));
    }

    #[tokio::test]
    async fn chat_without_session_asks_to_sign_in() {
        let server = MockServer::start().await;
        let (events, mut rx) = EventSink::channel();
        let (app, _inbox) = App::with_store(&config(&server), Store::in_memory().unwrap(), events).unwrap();

        app.execute(AppCommand::SendText("hello".into())).await;
        assert_eq!(
            toasts(&drain(&mut rx)),
            vec![(ToastLevel::Warning, "Please sign in first".to_string())]
        );
    }

    #[tokio::test]
    async fn shutdown_command_ends_the_loop() {
        let server = MockServer::start().await;
        let (events, _rx) = EventSink::channel();
        let (app, inbox) = App::with_store(&config(&server), Store::in_memory().unwrap(), events).unwrap();
        let commands = app.commands();

        commands.send(AppCommand::Shutdown).unwrap();
        tokio::time::timeout(Duration::from_secs(5), app.run(inbox))
            .await
            .expect("loop stops")
            .unwrap();
    }
}
