//! The cleaning-services chat widget: configuration, persona and server.

pub mod config;
pub mod prompt;
pub mod server;

pub use config::{ConfigError, WidgetConfig};
pub use prompt::{SERVICES, Service, system_prompt};
pub use server::WidgetServer;
