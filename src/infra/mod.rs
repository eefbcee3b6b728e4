//! Infrastructure adapters and runtime bootstrap.

pub mod backend;
pub mod error;
pub mod memory;
pub mod rest;
pub mod telemetry;
