#![forbid(unsafe_code)]

mod config;
mod ddl;
mod diff;
mod engine;
mod error;
mod exec;
mod live;
mod pto;

pub use config::*;
pub use ddl::*;
pub use diff::*;
pub use engine::*;
pub use error::*;
pub use exec::*;
pub use live::*;
pub use pto::*;
