use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz server.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::join_room,
        crate::routes::participants::leave,
        crate::routes::participants::buzz,
        crate::routes::participants::start_game,
        crate::routes::participants::start_question,
        crate::routes::participants::reveal_answer,
        crate::routes::participants::judge,
        crate::routes::sse::participant_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::JoinRequest,
            crate::dto::room::JoinResponse,
            crate::dto::room::JudgeRequest,
            crate::dto::room::ActionResponse,
            crate::dto::sse::Handshake,
            crate::dto::presentation::Notification,
            crate::dto::events::GameEvent,
            crate::dto::presence::PresenceMeta,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room membership"),
        (name = "participants", description = "Buzzer and host controls"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
