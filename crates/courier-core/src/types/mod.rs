//! Core types for Courier.

mod auth;
mod identifiers;
mod notification;

pub use auth::*;
pub use identifiers::*;
pub use notification::*;
