//! MCP server manager.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use avatarai_net::ApiClient;
use avatarai_shared::mcp::{InstallForm, McpServer};

use crate::error::Result;
use crate::events::{EventSink, UiEvent};

#[derive(Clone)]
pub struct McpManager {
    api: ApiClient,
    events: EventSink,
    /// Where the OAuth flow sends the browser back to.
    return_uri: String,
    servers: Arc<Mutex<Vec<McpServer>>>,
}

impl McpManager {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        let return_uri = api.url("/mcp");
        Self {
            api,
            events,
            return_uri,
            servers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn servers(&self) -> MutexGuard<'_, Vec<McpServer>> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report<T>(&self, what: &str, result: avatarai_net::Result<T>) -> Result<T> {
        result.map_err(|e| {
            self.events.error(format!("Failed to {what}: {e}"));
            e.into()
        })
    }

    pub async fn list(&self) -> Result<Vec<McpServer>> {
        let servers = self.report("load MCP servers", self.api.list_mcp_servers().await)?;
        *self.servers() = servers.clone();
        info!(count = servers.len(), "MCP servers loaded");
        self.events.emit(UiEvent::McpServers(servers.clone()));
        Ok(servers)
    }

    pub async fn detail(&self, mcp_id: &str) -> Result<McpServer> {
        let server = self.report("load MCP server", self.api.get_mcp_server(mcp_id).await)?;
        self.events.emit(UiEvent::McpServerDetail(server.clone()));
        Ok(server)
    }

    /// Start OAuth for a server. Returns the authorization URL to open, or
    /// `None` when the server is already authorized.
    pub async fn authorize(&self, mcp_id: &str) -> Result<Option<String>> {
        let response = self.report(
            "authorize MCP server",
            self.api.authorize_mcp_server(mcp_id, &self.return_uri).await,
        )?;
        if response.already_authorized {
            self.events.info("Already authorized");
            return Ok(None);
        }
        match response.authorization_url {
            Some(url) if !url.is_empty() => {
                self.events.emit(UiEvent::McpAuthorizeRedirect(url.clone()));
                Ok(Some(url))
            }
            _ => {
                self.events.error("No authorization URL returned");
                Ok(None)
            }
        }
    }

    pub async fn toggle_enabled(&self, mcp_id: &str, enabled: bool) -> Result<()> {
        self.report(
            "update MCP server",
            self.api.toggle_mcp_enabled(mcp_id, enabled).await,
        )?;

        let status = if enabled { "connected" } else { "disconnected" };
        let updated = self.update_local(mcp_id, |server| {
            server.enabled = enabled;
            server.status = status.to_string();
        });
        if updated {
            self.events.emit(UiEvent::McpServers(self.servers().clone()));
        }
        self.events
            .success(if enabled { "MCP server enabled" } else { "MCP server disabled" });
        Ok(())
    }

    pub async fn toggle_sync(&self, mcp_id: &str, sync: bool) -> Result<()> {
        self.report(
            "update resource sync",
            self.api.toggle_mcp_sync_resources(mcp_id, sync).await,
        )?;
        self.update_local(mcp_id, |server| server.sync_resources = sync);
        self.events.success(if sync {
            "Resource sync enabled"
        } else {
            "Resource sync disabled"
        });
        Ok(())
    }

    pub async fn uninstall(&self, mcp_id: &str) -> Result<()> {
        self.report(
            "uninstall MCP server",
            self.api.uninstall_mcp_server(mcp_id).await,
        )?;
        info!(mcp_id, "MCP server uninstalled");
        self.events.success("MCP server uninstalled");
        self.list().await?;
        Ok(())
    }

    pub async fn install(&self, form: InstallForm) -> Result<()> {
        let request = form.into_request().map_err(|e| {
            self.events.error(e.to_string());
            e
        })?;
        self.report(
            "install MCP server",
            self.api.install_mcp_server(&request).await,
        )?;
        info!(name = %request.name, "MCP server installed");
        self.events.success("MCP server installed");
        self.list().await?;
        Ok(())
    }

    pub fn cached(&self) -> Vec<McpServer> {
        self.servers().clone()
    }

    fn update_local(&self, mcp_id: &str, f: impl FnOnce(&mut McpServer)) -> bool {
        match self.servers().iter_mut().find(|s| s.mcp_id == mcp_id) {
            Some(server) => {
                f(server);
                true
            }
            None => false,
        }
    }
}
