//! Lazy import of referenced records and deferred relation wiring.

mod action;
mod stack;

pub use action::*;
pub use stack::*;
