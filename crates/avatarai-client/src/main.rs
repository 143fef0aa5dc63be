//! # avatarai
//!
//! Console client for the AvatarAI backend: chat with the assistant over the
//! streaming socket, browse and publish moments, edit the profile and manage
//! MCP servers.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    avatarai_client_lib::run().await
}
