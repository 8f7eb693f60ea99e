use axum::Json;
use schemars::schema::RootSchema;
use types::GenerationRequest;

/// JSON schema of the generation request body.
pub async fn schema() -> Json<RootSchema> {
    Json(schemars::schema_for!(GenerationRequest))
}
