/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Per-participant task executing the state machine effects.
pub mod participant_runtime;
/// Presentation sinks for state-change notifications.
pub mod presenter;
/// Join, leave and command routing for hosted participants.
pub mod room_service;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Room channels carrying game events and presence.
pub mod transport;
