//! # wasend-core
//!
//! Core types, traits, configuration, and error handling for wasend.

pub mod config;
pub mod error;
pub mod event;
pub mod recipient;
pub mod records;
pub mod template;
pub mod traits;

pub use config::shellexpand;
