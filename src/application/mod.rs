//! Application services layer: list, filter, overlay and admin state machines.

pub mod admin;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod list;
pub mod overlay;
pub mod repos;
