use axum::Json;
use sched_core::audit::audit;
use sched_core::scoring::compute_soft_scores;
use sched_core::Prep;
use serde::{Deserialize, Serialize};
use types::{Assignment, ConflictInfo, Instance};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ExplainIn {
    pub instance: Instance,
    pub assignments: Vec<Assignment>,
}

#[derive(Serialize, ToSchema)]
pub struct ExplainOut {
    /// Soft-constraint breakdown (satisfied, violated, weighted penalty, windows).
    #[schema(value_type = Object)]
    pub soft: serde_json::Value,
    /// Hard clashes the schedule contains.
    pub conflicts: Vec<ConflictInfo>,
}

#[utoipa::path(
    post,
    path = "/v1/explain",
    request_body = ExplainIn,
    responses(
    (status = 200, description = "Soft-score breakdown and hard clashes of the provided schedule", body = ExplainOut)
    )
)]
pub async fn explain(Json(input): Json<ExplainIn>) -> Json<ExplainOut> {
    let soft = compute_soft_scores(&input.instance, &input.assignments);
    let prep = Prep::new(&input.instance);
    Json(ExplainOut {
        soft: serde_json::to_value(soft).unwrap_or_default(),
        conflicts: audit(&prep, &input.assignments),
    })
}
