// Adapters layer: concrete implementations for external systems
// (the provider's registration API, the inbound broker HTTP surface).

pub mod http;
pub mod provider;
