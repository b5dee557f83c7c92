pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::http::{router, AppState, BasicCredentials};
pub use adapters::provider::KalturaClient;
pub use config::{BrokerSettings, CliConfig};
pub use crate::core::{
    catalog::CatalogDescriptor, engine::LifecycleEngine, registry::InstanceRegistry,
};
pub use utils::error::{BrokerError, Result};
