// Domain layer: broker records, catalog types and the provider port.

pub mod catalog;
pub mod model;
pub mod ports;
