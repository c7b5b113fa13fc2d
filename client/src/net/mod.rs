//! Networking modules for the same-origin auth API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` performs the HTTP calls and `types` defines their JSON shapes.

pub mod api;
pub mod types;
