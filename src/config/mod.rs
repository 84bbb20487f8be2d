//! Target configuration.

pub mod target;
