//! Outpost simulation core.
//!
//! A tick-driven idle economy: missions are generated into a perishable
//! catalog, assigned to workers, completed for rewards, and the whole state
//! is persisted so time spent closed can be caught up on the next start.

pub mod catalog;
pub mod clock;
pub mod command;
pub mod completion_subsystem;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod event;
pub mod expiration_subsystem;
pub mod generation_subsystem;
pub mod host;
pub mod offline;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod types;
