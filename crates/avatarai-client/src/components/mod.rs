//! UI components. Each owns its view-model and reports changes as
//! [`UiEvent`](crate::events::UiEvent)s; none of them knows about the others.
//! The application shell wires them together.

pub mod auth;
pub mod chat;
pub mod feed;
pub mod mcp;
pub mod post;
pub mod profile;
pub mod reducer;
pub mod thread;
