//! Foundational types for the EmberScript engine.

pub mod errors;
pub mod ident;
pub mod source;
