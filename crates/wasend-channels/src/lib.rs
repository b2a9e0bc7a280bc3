//! # wasend-channels
//!
//! Messaging client integrations for wasend.

pub mod whatsapp;
