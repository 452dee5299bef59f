//! Core types for conductor.

pub mod agent;
pub mod conversation;
pub mod message;
pub mod stream;

pub use agent::*;
pub use conversation::*;
pub use message::*;
pub use stream::*;
