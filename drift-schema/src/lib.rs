#![forbid(unsafe_code)]

mod error;
mod metadata;
mod model;
mod parser;
mod types;
mod validate;
mod yaml;

pub use error::*;
pub use metadata::*;
pub use model::*;
pub use parser::*;
pub use types::*;
pub use validate::*;
pub use yaml::*;
