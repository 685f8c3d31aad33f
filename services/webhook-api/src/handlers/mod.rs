//! REST API handlers

pub mod health;
pub mod replay;
pub mod webhooks;

pub use health::*;
pub use replay::*;
pub use webhooks::*;
