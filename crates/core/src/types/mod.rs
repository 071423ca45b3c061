//! Core types for orderdesk.
//!
//! This module provides type-safe wrappers for the order domain.

pub mod id;
pub mod order;
pub mod stats;
pub mod status;

pub use id::*;
pub use order::{Address, CustomerSnapshot, LineItem, Order, OrderPatch};
pub use stats::{Stats, StatsProvenance, StatsSummary};
pub use status::*;
