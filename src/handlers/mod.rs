//! HTTP handlers

pub mod health;
pub mod predict;
pub mod pokemon;
pub mod tools;
pub mod quiz;
