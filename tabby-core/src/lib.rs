//! Shared infrastructure for the tabby engine crates.
//!
//! The pool module can be useful separately outside the engine.

#[macro_use]
extern crate lazy_static;

pub use arrayvec;
pub use nalgebra as algebra;
pub use parking_lot;
pub use rand;

pub mod log;
pub mod pool;
