//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own backend calls and credential handling so route
//! handlers can stay focused on request/response translation.

pub mod backend;
pub mod session;
