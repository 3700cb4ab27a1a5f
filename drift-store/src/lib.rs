#![forbid(unsafe_code)]

mod database;
mod engine;
mod error;
mod metadata;
mod migration;
mod store;

pub use database::*;
pub use engine::*;
pub use error::*;
pub use metadata::*;
pub use migration::*;
pub use store::*;
