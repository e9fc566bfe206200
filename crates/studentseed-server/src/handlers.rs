use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use studentseed_core::pipeline::{generate_and_insert, GenerationRequest};
use studentseed_core::store::ConnectionParams;

use crate::errors::AppError;
use crate::{AppState, Connector};

/// Records generated when `samples` is omitted.
pub const DEFAULT_SAMPLES: usize = 10;
/// Reference rows loaded when `limit` is omitted.
pub const DEFAULT_LIMIT: u64 = 5;

/// Query string of `POST /generate-students`. Omitted connection fields fall
/// back to the server's configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuery {
    pub samples: Option<usize>,
    pub limit: Option<u64>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl GenerateQuery {
    fn connection_params(&self, defaults: &ConnectionParams) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone().unwrap_or_else(|| defaults.host.clone()),
            port: self.port.unwrap_or(defaults.port),
            dbname: self.dbname.clone().unwrap_or_else(|| defaults.dbname.clone()),
            user: self.user.clone().unwrap_or_else(|| defaults.user.clone()),
            password: self
                .password
                .clone()
                .unwrap_or_else(|| defaults.password.clone()),
        }
    }

    fn request(&self) -> GenerationRequest {
        GenerationRequest {
            samples: self.samples.unwrap_or(DEFAULT_SAMPLES),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub inserted_ids: Vec<i64>,
    pub count: usize,
}

impl GenerateResponse {
    fn from_ids(inserted_ids: Vec<i64>) -> Self {
        if inserted_ids.is_empty() {
            Self {
                success: false,
                message: "No data was inserted".to_string(),
                inserted_ids,
                count: 0,
            }
        } else {
            Self {
                success: true,
                message: format!(
                    "Successfully generated and inserted {} synthetic student profiles",
                    inserted_ids.len()
                ),
                count: inserted_ids.len(),
                inserted_ids,
            }
        }
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Synthetic Data Generation API" }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Open a store for this request, run the pipeline, and report the ids.
pub async fn generate_students<C: Connector>(
    State(state): State<Arc<AppState<C>>>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<GenerateResponse>, AppError> {
    let params = query.connection_params(&state.connection_defaults);
    let request = query.request();
    info!(
        host = %params.host,
        dbname = %params.dbname,
        samples = request.samples,
        limit = request.limit,
        "Generating synthetic students"
    );

    let store = state.connector.open(&params).await?;
    let result = generate_and_insert(&store, request, &state.settings).await;
    state.connector.close(store).await;
    let report = result?;

    Ok(Json(GenerateResponse::from_ids(report.inserted_ids)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_falls_back_to_defaults() {
        let defaults = ConnectionParams::default();
        let query = GenerateQuery {
            host: Some("db".to_string()),
            ..GenerateQuery::default()
        };
        let params = query.connection_params(&defaults);
        assert_eq!(params.host, "db");
        assert_eq!(params.port, 5432);
        assert_eq!(params.password, "admin");
        assert_eq!(
            query.request(),
            GenerationRequest {
                samples: DEFAULT_SAMPLES,
                limit: DEFAULT_LIMIT
            }
        );
    }

    #[test]
    fn test_response_messages() {
        let ok = GenerateResponse::from_ids(vec![4, 5]);
        assert!(ok.success);
        assert_eq!(ok.count, 2);
        assert_eq!(
            ok.message,
            "Successfully generated and inserted 2 synthetic student profiles"
        );

        let empty = GenerateResponse::from_ids(Vec::new());
        assert!(!empty.success);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.message, "No data was inserted");
    }
}
