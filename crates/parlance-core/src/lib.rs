pub mod builtin;
pub mod catalog;
pub mod command;
pub mod config;
pub mod context;
mod error;

pub use catalog::{IntentCard, IntentCatalog, Resolver};
pub use command::{NewsTab, StructuredCommand, Theme, View};
pub use config::RouterConfig;
pub use context::RouteContext;
pub use error::{CatalogError, ConfigError};
