mod error;
mod state;
mod telemetry;
pub mod routes {
    pub mod disruptions;
    pub mod explain;
    pub mod generate;
    pub mod health;
    pub mod jobs;
    pub mod preferences;
    pub mod schema;
    pub mod validate;
}

use axum::{
    routing::{get, post},
    Router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            routes::health::health,
            routes::validate::validate_handler,
            routes::generate::generate,
            routes::jobs::status,
            routes::jobs::result,
            routes::jobs::cancel,
            routes::explain::explain,
            routes::preferences::parse,
            routes::disruptions::report,
            routes::disruptions::list,
            routes::disruptions::simulate,
            routes::disruptions::options,
            routes::disruptions::execute,
        ),
        components(schemas(
            types::Instance, types::Course, types::Instructor, types::Room, types::TimeSlot,
            types::Student, types::Assignment, types::Constraint, types::ConstraintScope,
            types::ConstraintPayload, types::ConstraintKind, types::Polarity, types::EntityType,
            types::DayPeriod, types::DayOfWeek, types::CourseType, types::RoomType,
            types::ConflictInfo, types::ConflictKind, types::Severity, types::Strategy,
            types::GenerationConfig, types::GenerationRequest, types::OptimizationResult,
            types::CourseId, types::InstructorId, types::RoomId, types::SlotId, types::StudentId,
            types::ConstraintId, types::EventId, types::OptionId,
            types::DisruptionEvent, types::DisruptionKind, types::DisruptionSeverity,
            types::AffectedResource, types::ResourceKind, types::Impact, types::EventStatus,
            types::ImpactAssessment, types::ChangeKind, types::ScheduleChange, types::OptionKind,
            types::ReschedulingOption, types::RollbackPlan, types::ExecutionOutcome,
            jobs::JobId, jobs::JobStatus,
            disruption::NotificationPlan,
            routes::health::Health,
            routes::validate::ValidationReport,
            routes::generate::JobCreated,
            routes::jobs::Cancelled,
            routes::explain::ExplainIn,
            routes::explain::ExplainOut,
            routes::preferences::ParseIn,
            routes::preferences::PreferenceText,
            routes::preferences::ParsedConstraint,
            routes::disruptions::ReportIn,
            routes::disruptions::ScheduleIn,
            routes::disruptions::SimulateIn,
            routes::disruptions::OptionsOut,
            routes::disruptions::ExecuteIn,
            routes::disruptions::ExecuteOut
        )),
        tags(
            (name = "timetable", description = "Timetable generation and disruption handling API")
        )
    )]
struct ApiDoc;

fn app(state: state::AppState) -> Router {
    let router = Router::new()
        .route("/v1/health", get(routes::health::health))
        .route("/v1/validate", post(routes::validate::validate_handler))
        .route("/v1/generate", post(routes::generate::generate))
        .route("/v1/jobs/:id", get(routes::jobs::status))
        .route("/v1/jobs/:id/result", get(routes::jobs::result))
        .route("/v1/jobs/:id/cancel", post(routes::jobs::cancel))
        .route("/v1/explain", post(routes::explain::explain))
        .route("/v1/preferences/parse", post(routes::preferences::parse))
        .route(
            "/v1/disruptions",
            post(routes::disruptions::report).get(routes::disruptions::list),
        )
        .route("/v1/disruptions/simulate", post(routes::disruptions::simulate))
        .route("/v1/disruptions/:id/options", post(routes::disruptions::options))
        .route("/v1/disruptions/:id/execute", post(routes::disruptions::execute))
        .route("/v1/schema", get(routes::schema::schema))
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));
    telemetry::wrap(router).with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app = app(state::AppState::new_default());

    let port = std::env::var("TIMETABLE__SERVER__PORT").unwrap_or_else(|_| "8080".into());
    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
