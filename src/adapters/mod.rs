// Adapters layer: concrete implementations for external systems (storage, later maybe http).
pub mod local;

pub use local::LocalStorage;
