//! Transport adapters: reqwest towards the provider, axum towards the widget.

#[cfg(feature = "http-client")]
pub mod openai;
#[cfg(feature = "http-server")]
pub mod server;

#[cfg(feature = "http-client")]
pub use openai::OpenAiProvider;
#[cfg(feature = "http-server")]
pub use server::{ChatRouteState, chat_router};
