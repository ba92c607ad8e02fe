pub mod api;
pub mod context;
pub mod cycle;
pub mod entity;
pub mod model;
pub mod settings;
pub mod snapshot;

pub use api::{Client, Error};
pub use context::Context;
