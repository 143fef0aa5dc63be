//! Types shared by every AvatarAI crate: the data model, the WebSocket wire
//! protocol, client-side limits and validation, rich-text facets and the
//! session handle.

pub mod chat;
pub mod constants;
pub mod error;
pub mod feed;
pub mod mcp;
pub mod protocol;
pub mod richtext;
pub mod session;
pub mod token;
pub mod types;
pub mod validate;

pub use error::{ProtocolError, ValidationError};
pub use session::{Session, SessionState};
pub use types::User;
