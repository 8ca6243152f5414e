//! Data types shared across transcript sources.

pub mod cue;
pub mod relay;
pub mod transcript;
