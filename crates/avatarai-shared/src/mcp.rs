use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// An installed MCP server as listed by `/api/mcp/servers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub mcp_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sync_resources: bool,
    #[serde(default)]
    pub is_builtin: bool,
    #[serde(default)]
    pub authorization: McpAuthorization,
    #[serde(default)]
    pub endpoint: Option<McpEndpoint>,
    #[serde(default)]
    pub capabilities: BTreeMap<String, Value>,
}

impl McpServer {
    pub fn is_connected(&self) -> bool {
        self.status == "connected"
    }

    pub fn needs_oauth(&self) -> bool {
        self.authorization.method == "oauth2"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct McpAuthorization {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub scopes: Option<Value>,
}

impl McpAuthorization {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn method_label(&self) -> &str {
        match self.method.as_str() {
            "none" => "No authorization",
            "oauth2" => "OAuth 2.0",
            "api_key" => "API key",
            "bearer_token" => "Bearer token",
            other => other,
        }
    }

    pub fn status_label(&self) -> &str {
        match self.status.as_str() {
            "active" => "Active",
            "inactive" => "Inactive",
            "disabled" => "Disabled",
            "expired" => "Expired",
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointType {
    #[serde(rename = "stdio")]
    Stdio,
    #[serde(rename = "sse")]
    Sse,
    #[serde(rename = "websocket")]
    WebSocket,
    #[serde(rename = "streamableHttp")]
    StreamableHttp,
}

impl EndpointType {
    pub fn is_remote(&self) -> bool {
        !matches!(self, EndpointType::Stdio)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Stdio => "stdio",
            EndpointType::Sse => "sse",
            EndpointType::WebSocket => "websocket",
            EndpointType::StreamableHttp => "streamableHttp",
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(EndpointType::Stdio),
            "sse" => Ok(EndpointType::Sse),
            "websocket" => Ok(EndpointType::WebSocket),
            "streamableHttp" => Ok(EndpointType::StreamableHttp),
            other => Err(ValidationError::UnknownEndpointType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct McpEndpoint {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, Value>,
}

/// Body of `POST /api/mcp/servers/install`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallMcpServer {
    pub name: String,
    pub endpoint: McpEndpoint,
}

/// Raw install form as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct InstallForm {
    pub name: String,
    pub endpoint_type: String,
    pub command: String,
    /// One argument per line.
    pub args: String,
    pub url: String,
    /// JSON object text.
    pub headers: String,
    /// JSON object text.
    pub env: String,
}

impl InstallForm {
    /// Validate the form and build the install request body.
    pub fn into_request(self) -> Result<InstallMcpServer, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::Required("Server name"));
        }
        let kind: EndpointType = self.endpoint_type.trim().parse()?;

        let mut endpoint = McpEndpoint {
            kind: Some(kind.to_string()),
            ..Default::default()
        };

        if kind.is_remote() {
            let url = self.url.trim();
            if url.is_empty() {
                return Err(ValidationError::Required("Server URL"));
            }
            endpoint.url = Some(url.to_string());
            endpoint.headers = parse_json_object(&self.headers, "Headers")?;
        } else {
            let command = self.command.trim();
            if command.is_empty() {
                return Err(ValidationError::Required("Command"));
            }
            endpoint.command = Some(command.to_string());
            endpoint.args = self
                .args
                .trim()
                .lines()
                .map(str::trim)
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect();
        }
        endpoint.env = parse_json_object(&self.env, "Environment variables")?;

        Ok(InstallMcpServer { name, endpoint })
    }
}

fn parse_json_object(
    text: &str,
    field: &'static str,
) -> Result<BTreeMap<String, Value>, ValidationError> {
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(text).map_err(|_| ValidationError::InvalidJson { field })
}

/// Response of `/api/mcp/oauth/authorize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AuthorizeResponse {
    #[serde(default)]
    pub already_authorized: bool,
    #[serde(default)]
    pub authorization_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct McpServerList {
    #[serde(default)]
    pub servers: Vec<McpServer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stdio_form_splits_args_by_line() {
        let form = InstallForm {
            name: "files".into(),
            endpoint_type: "stdio".into(),
            command: "npx".into(),
            args: "-y\n\n @mcp/fs \n/tmp\n".into(),
            env: r#"{"DEBUG":"1"}"#.into(),
            ..Default::default()
        };
        let req = form.into_request().unwrap();
        assert_eq!(req.endpoint.args, vec!["-y", "@mcp/fs", "/tmp"]);
        assert_eq!(req.endpoint.env.get("DEBUG"), Some(&json!("1")));
        assert_eq!(req.endpoint.url, None);
    }

    #[test]
    fn remote_form_requires_json_headers() {
        let form = InstallForm {
            name: "search".into(),
            endpoint_type: "sse".into(),
            url: "https://mcp.example/sse".into(),
            headers: "{not json".into(),
            ..Default::default()
        };
        assert_eq!(
            form.into_request(),
            Err(ValidationError::InvalidJson { field: "Headers" })
        );
    }

    #[test]
    fn unknown_endpoint_type() {
        let form = InstallForm {
            name: "x".into(),
            endpoint_type: "grpc".into(),
            ..Default::default()
        };
        assert!(matches!(
            form.into_request(),
            Err(ValidationError::UnknownEndpointType(_))
        ));
    }

    #[test]
    fn install_body_shape() {
        let form = InstallForm {
            name: "search".into(),
            endpoint_type: "streamableHttp".into(),
            url: "https://mcp.example".into(),
            headers: r#"{"X-Key":"k"}"#.into(),
            ..Default::default()
        };
        let value = serde_json::to_value(form.into_request().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "search",
                "endpoint": {"type": "streamableHttp", "url": "https://mcp.example", "headers": {"X-Key": "k"}}
            })
        );
    }

    #[test]
    fn server_labels() {
        let server: McpServer = serde_json::from_value(json!({
            "mcpId": "m1",
            "name": "GitHub",
            "status": "connected",
            "enabled": true,
            "authorization": {"method": "oauth2", "status": "expired"}
        }))
        .unwrap();
        assert!(server.is_connected());
        assert!(server.needs_oauth());
        assert_eq!(server.authorization.method_label(), "OAuth 2.0");
        assert_eq!(server.authorization.status_label(), "Expired");
    }
}
