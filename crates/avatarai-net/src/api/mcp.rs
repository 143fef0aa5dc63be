use serde_json::{json, Value};

use avatarai_shared::mcp::{AuthorizeResponse, InstallMcpServer, McpServer, McpServerList};

use super::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// `GET /api/mcp/servers`.
    pub async fn list_mcp_servers(&self) -> Result<Vec<McpServer>> {
        let list: McpServerList = self.get_json("/api/mcp/servers").await?;
        Ok(list.servers)
    }

    /// `GET /api/mcp/servers/{mcpId}`. Accepts the record bare or wrapped in
    /// a `server` field.
    pub async fn get_mcp_server(&self, mcp_id: &str) -> Result<McpServer> {
        let mut value: Value = self.get_json(&format!("/api/mcp/servers/{mcp_id}")).await?;
        let record = match value.get_mut("server").map(Value::take) {
            Some(inner) => inner,
            None => value,
        };
        Ok(serde_json::from_value(record)?)
    }

    /// `GET /api/mcp/oauth/authorize`.
    pub async fn authorize_mcp_server(
        &self,
        mcp_id: &str,
        return_uri: &str,
    ) -> Result<AuthorizeResponse> {
        self.get_json_with_query(
            "/api/mcp/oauth/authorize",
            &[("mcpId", mcp_id), ("returnUri", return_uri)],
        )
        .await
    }

    /// `POST /api/mcp/servers/{mcpId}/toggle-enabled`.
    pub async fn toggle_mcp_enabled(&self, mcp_id: &str, enabled: bool) -> Result<Value> {
        self.post_json(
            &format!("/api/mcp/servers/{mcp_id}/toggle-enabled"),
            &json!({ "enabled": enabled }),
        )
        .await
    }

    /// `POST /api/mcp/servers/{mcpId}/toggle-sync-resources`.
    pub async fn toggle_mcp_sync_resources(&self, mcp_id: &str, sync: bool) -> Result<Value> {
        self.post_json(
            &format!("/api/mcp/servers/{mcp_id}/toggle-sync-resources"),
            &json!({ "syncResources": sync }),
        )
        .await
    }

    /// `DELETE /api/mcp/servers/uninstall?mcpId=`.
    pub async fn uninstall_mcp_server(&self, mcp_id: &str) -> Result<Value> {
        self.delete_json("/api/mcp/servers/uninstall", &[("mcpId", mcp_id)])
            .await
    }

    /// `POST /api/mcp/servers/install`.
    pub async fn install_mcp_server(&self, request: &InstallMcpServer) -> Result<Value> {
        self.post_json("/api/mcp/servers/install", request).await
    }
}
