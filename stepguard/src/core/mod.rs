//! Deterministic, pure logic shared by the constraint engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod constraint;
pub mod contract;
pub mod feedback;
pub mod state;
pub mod trace;
pub mod types;
