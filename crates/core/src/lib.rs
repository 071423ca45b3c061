//! orderdesk core - shared order domain types.
//!
//! This crate provides the types used across all orderdesk components:
//! - `admin` - Order management subsystem (store, query pipeline, export)
//! - `cli` - Command-line console driving the order store
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, the order status lifecycle, orders, and statistics

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
