use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use disruption::options::affected_assignments;
use disruption::{
    execute_for_event, generate_options, new_event, DisruptionSimulator, NotificationPlan,
};
use sched_core::validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use types::{
    AffectedResource, Assignment, DayOfWeek, DisruptionEvent, DisruptionKind, DisruptionSeverity,
    EventId, ExecutionOutcome, Instance, ReschedulingOption,
};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportIn {
    pub kind: DisruptionKind,
    pub severity: DisruptionSeverity,
    #[serde(default)]
    pub description: String,
    pub affected_resources: Vec<AffectedResource>,
    #[serde(default)]
    pub affected_days: BTreeSet<DayOfWeek>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Include resolved and cancelled events.
    #[serde(default)]
    pub all: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ScheduleIn {
    pub instance: Instance,
    pub schedule: Vec<Assignment>,
}

#[derive(Deserialize, ToSchema)]
pub struct SimulateIn {
    pub instance: Instance,
    pub schedule: Vec<Assignment>,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Serialize, ToSchema)]
pub struct OptionsOut {
    pub affected: Vec<Assignment>,
    pub options: Vec<ReschedulingOption>,
}

#[derive(Deserialize, ToSchema)]
pub struct ExecuteIn {
    pub instance: Instance,
    pub schedule: Vec<Assignment>,
    pub option: ReschedulingOption,
}

#[derive(Serialize, ToSchema)]
pub struct ExecuteOut {
    pub outcome: ExecutionOutcome,
    pub notification: Option<NotificationPlan>,
}

fn checked(inst: &Instance) -> Result<(), ApiError> {
    validate(inst).map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/v1/disruptions",
    request_body = ReportIn,
    responses((status = 201, description = "Event is active and subscribers were notified", body = DisruptionEvent))
)]
pub async fn report(
    State(state): State<AppState>,
    Json(input): Json<ReportIn>,
) -> Result<(StatusCode, Json<DisruptionEvent>), ApiError> {
    let mut ev = new_event(
        input.kind,
        input.severity,
        input.affected_resources,
        input.affected_days,
    );
    ev.description = input.description;
    let ev = state.detector.report(ev)?;
    Ok((StatusCode::CREATED, Json(ev)))
}

#[utoipa::path(
    get,
    path = "/v1/disruptions",
    params(ListQuery),
    responses((status = 200, description = "Active events, oldest first", body = [DisruptionEvent]))
)]
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Json<Vec<DisruptionEvent>> {
    Json(if q.all {
        state.detector.history()
    } else {
        state.detector.active()
    })
}

#[utoipa::path(
    post,
    path = "/v1/disruptions/simulate",
    request_body = SimulateIn,
    responses(
        (status = 201, description = "Simulated event, reported like a real one", body = DisruptionEvent),
        (status = 409, description = "Nothing scheduled to disrupt")
    )
)]
pub async fn simulate(
    State(state): State<AppState>,
    Json(input): Json<SimulateIn>,
) -> Result<(StatusCode, Json<DisruptionEvent>), ApiError> {
    checked(&input.instance)?;
    let ev = DisruptionSimulator::new(input.seed)
        .next_event(&input.instance, &input.schedule)
        .ok_or_else(|| ApiError::Conflict("schedule is empty".into()))?;
    let ev = state.detector.report(ev)?;
    Ok((StatusCode::CREATED, Json(ev)))
}

#[utoipa::path(
    post,
    path = "/v1/disruptions/{id}/options",
    params(("id" = String, Path, description = "Event ID")),
    request_body = ScheduleIn,
    responses(
        (status = 200, description = "Hit assignments and ranked options", body = OptionsOut),
        (status = 404, description = "Unknown event")
    )
)]
pub async fn options(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ScheduleIn>,
) -> Result<Json<OptionsOut>, ApiError> {
    checked(&input.instance)?;
    let id = EventId(id);
    let ev = state
        .detector
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown disruption event {id}")))?;
    Ok(Json(OptionsOut {
        affected: affected_assignments(&ev, &input.instance, &input.schedule),
        options: generate_options(&ev, &input.instance, &input.schedule),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/disruptions/{id}/execute",
    params(("id" = String, Path, description = "Event ID")),
    request_body = ExecuteIn,
    responses(
        (status = 200, description = "Execution outcome with rollback plan", body = ExecuteOut),
        (status = 404, description = "Unknown event"),
        (status = 409, description = "Event is no longer active")
    )
)]
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ExecuteIn>,
) -> Result<Json<ExecuteOut>, ApiError> {
    checked(&input.instance)?;
    let id = EventId(id);
    let outcome = execute_for_event(
        &state.detector,
        &id,
        &input.option,
        &input.instance,
        &input.schedule,
    )?;

    let notification = if outcome.success {
        let plan = NotificationPlan::for_option(&input.option, &input.instance);
        if let Err(e) = state.notifier.notify(&plan).await {
            tracing::warn!(event = %id, error = %e, "notification failed");
        }
        Some(plan)
    } else {
        None
    };
    Ok(Json(ExecuteOut {
        outcome,
        notification,
    }))
}
