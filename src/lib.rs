//! Library crate for buzzer-quiz, exposing modules for the binary and integration tests.
//!
//! A host drives a quiz room by emitting [`dto::events::GameEvent`]s; every
//! participant, the host included, applies them through
//! [`state::state_machine::apply`] so their local views converge.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
