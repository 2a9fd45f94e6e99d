//! ask-service: answers `POST /ask` prompts with a locally loaded language model.
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
