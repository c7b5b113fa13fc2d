//! Per-tab session state for the tunematch web app.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each open tab owns one [`state::session::SessionStore`]. Stores learn who
//! is signed in from the server over [`net::api`] and wake each other up
//! through a [`notify::Notifier`] when one of them signs in or out.

pub mod net;
pub mod notify;
pub mod state;

#[cfg(test)]
mod test_support;
