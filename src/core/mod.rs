pub mod catalog;
pub mod engine;
pub mod registry;

pub use crate::domain::model::{Credentials, ProvisionRequest, ServiceInstance};
pub use crate::domain::ports::ResourceProvider;
pub use crate::utils::error::Result;
