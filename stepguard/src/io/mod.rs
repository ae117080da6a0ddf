//! I/O helpers for the constraint engine.

pub mod config;
