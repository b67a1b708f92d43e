//! Configuration module

mod site;
mod store;

pub use site::SiteConfig;
pub use store::{ConfigError, StoreConfig};
