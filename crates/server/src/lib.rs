//! Droplet board server library.
//!
//! A [`Session`] replays a script of board actions; every `GET /state`
//! advances it by one tick and answers with the resulting snapshot.

pub mod action;
pub mod board;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;

// Re-export commonly used types
pub use action::Action;
pub use board::{Board, Droplet};
pub use config::Config;
pub use error::BoardError;
pub use routes::{router, SharedSession};
pub use session::{route, ScriptBuilder, Session};
