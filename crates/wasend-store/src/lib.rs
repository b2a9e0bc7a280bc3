//! # wasend-store
//!
//! Record storage for wasend: one JSON file per collection, or memory only.

pub mod store;

pub use store::{LogPage, LogStats, Store, StoreCounts};
