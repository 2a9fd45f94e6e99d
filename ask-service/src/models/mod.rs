//! Wire types for the HTTP API.

pub mod ask;

pub use ask::{AskRequest, AskResponse};
