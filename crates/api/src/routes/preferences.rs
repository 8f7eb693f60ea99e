use axum::Json;
use sched_core::prefs::{describe, parse_all};
use serde::{Deserialize, Serialize};
use types::{Constraint, ConstraintScope};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct PreferenceText {
    pub scope: ConstraintScope,
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ParseIn {
    pub items: Vec<PreferenceText>,
}

#[derive(Serialize, ToSchema)]
pub struct ParsedConstraint {
    #[serde(flatten)]
    pub constraint: Constraint,
    pub summary: String,
}

#[utoipa::path(
    post,
    path = "/v1/preferences/parse",
    request_body = ParseIn,
    responses(
    (status = 200, description = "Constraints found in the texts; unmatched texts yield none", body = [ParsedConstraint])
    )
)]
pub async fn parse(Json(input): Json<ParseIn>) -> Json<Vec<ParsedConstraint>> {
    let items = input.items.iter().map(|p| (&p.scope, p.text.as_str()));
    Json(
        parse_all(items)
            .into_iter()
            .map(|c| ParsedConstraint {
                summary: describe(&c.payload),
                constraint: c,
            })
            .collect(),
    )
}
