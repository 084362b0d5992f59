//! Rental contract lifecycle for a game-rental catalog.
//!
//! Contracts move `Pending -> Active -> Completed | Canceled`, with `Active`
//! contracts turning `Overdue` once their due date passes. That last step is
//! never requested by anyone; it happens when a contract is read (see
//! [`reconcile`]).

pub mod clock;
pub mod config;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod utils;
