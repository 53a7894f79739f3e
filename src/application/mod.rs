//! Application layer: wiring of services and adapters

pub mod context;

pub use context::AppContext;
