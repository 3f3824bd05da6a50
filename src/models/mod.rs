//! Value types with domain behavior.

pub mod slot;

pub use slot::TimeSlot;
