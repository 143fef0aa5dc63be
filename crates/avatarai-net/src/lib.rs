// Network layer: REST client for the backend and the streaming chat transport.

pub mod api;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod reconnect;
pub mod stream;

pub use api::{ApiClient, SigninRedirect, DEFAULT_TIMEOUT};
pub use credentials::{Credentials, StaticToken};
pub use dispatch::{Dispatcher, FrameHandler};
pub use error::{NetError, Result};
pub use reconnect::ReconnectPolicy;
pub use stream::{
    spawn_stream, stream_url, ConnectionStatus, StreamCommand, StreamConfig, StreamHandle,
    StreamNotification,
};
