//! Client-side state containers.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` is the render-facing snapshot; `session` owns and mutates it.

pub mod auth;
pub mod session;
