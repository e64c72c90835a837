//! Request handlers.

pub mod health;
pub mod model;
pub mod videos;

pub use health::*;
pub use model::*;
pub use videos::*;
