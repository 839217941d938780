//! Core types for mindcord.

mod event;
mod personality;
mod reminder;
mod user;
mod venue;

pub use event::*;
pub use personality::*;
pub use reminder::*;
pub use user::*;
pub use venue::*;
