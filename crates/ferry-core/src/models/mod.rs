//! Data models shared across Ferry components.

mod artifact;
mod upload;

pub use artifact::*;
pub use upload::*;
