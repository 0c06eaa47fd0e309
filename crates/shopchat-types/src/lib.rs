//! Shared types for the shopchat widget engine.

mod chat;
mod events;
mod stream;

pub use chat::*;
pub use events::*;
pub use stream::*;
