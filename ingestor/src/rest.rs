use crate::db;
use crate::errors::Error;
use crate::metrics::{
    INVALID_QUERIES_TOTAL, INVALID_READINGS_TOTAL, QUERIES_TOTAL, READINGS_RECEIVED_TOTAL,
};
use crate::model::{AppendResponse, MeasurementReading};
use crate::validate::validate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
struct AppState {
    pool: SqlitePool,
}

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    date: Option<String>,
}

pub fn create_router(pool: SqlitePool) -> Router {
    let state = AppState { pool };

    Router::new()
        .route("/api/readings", get(get_readings).post(post_reading))
        .with_state(state)
}

async fn post_reading(
    State(state): State<AppState>,
    Json(reading): Json<MeasurementReading>,
) -> Result<Json<AppendResponse>, AppError> {
    READINGS_RECEIVED_TOTAL.inc();

    if let Err(e) = validate(&reading) {
        INVALID_READINGS_TOTAL.inc();
        return Err(e.into());
    }

    db::append(&state.pool, &reading).await?;
    Ok(Json(AppendResponse::ok()))
}

async fn get_readings(
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> Result<Json<Vec<MeasurementReading>>, AppError> {
    QUERIES_TOTAL.inc();

    let day = match params.date.as_deref() {
        Some(raw) => match db::parse_day(raw) {
            Ok(day) => Some(day),
            Err(e) => {
                INVALID_QUERIES_TOTAL.inc();
                return Err(e.into());
            }
        },
        None => None,
    };

    let readings = db::query(&state.pool, day).await?;
    debug!("Query for {:?} returned {} readings", day, readings.len());

    Ok(Json(readings))
}

struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("API error: {}", self.0);
            (status, format!("Internal server error: {}", self.0)).into_response()
        } else {
            warn!("Rejected request: {}", self.0);
            (status, self.0.to_string()).into_response()
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}
