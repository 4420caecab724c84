//! Data models

pub mod pokemon;
pub mod pokemon_type;
pub mod quiz;

pub use pokemon::*;
pub use pokemon_type::*;
pub use quiz::*;
