//! Seams to the external collaborators the engine consumes.

mod delivery;
mod generation;

pub use delivery::*;
pub use generation::*;
