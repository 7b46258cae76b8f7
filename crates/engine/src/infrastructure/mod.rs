//! Infrastructure: port traits and their adapters.

pub mod clock;
pub mod content;
pub mod memory;
pub mod openai;
pub mod ports;
