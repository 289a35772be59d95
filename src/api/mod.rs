use std::any::Any;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::core::{
    AccumulationResult, AccumulationSummary, CalculationInput, FieldError, JourneyInput,
    JourneyResult, JourneySummary, JourneyYearRecord, ValidationError, YearRecord, accumulate,
    run_journey,
};

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

/// Everything the HTTP boundary needs to know up front.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Exact origins, or a single `*` for any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
        }
    }
}

impl ServerConfig {
    fn cors_layer(&self) -> CorsLayer {
        let base = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        if self.allowed_origins.iter().any(|o| o == "*") {
            return base.allow_origin(AnyOrigin);
        }

        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        if origins.is_empty() {
            warn!("no valid CORS origins configured, cross-origin requests will be refused");
        }
        base.allow_origin(origins)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid request body: {0}")]
    MalformedBody(String),
    #[error("Not found")]
    NotFound,
    #[error("Internal server error")]
    Internal,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> ErrorResponse {
        let (message, errors) = match self {
            ApiError::Validation(err) => ("Validation error".to_string(), err.errors),
            ApiError::MalformedBody(detail) => (
                "Validation error".to_string(),
                vec![FieldError::new("body", detail)],
            ),
            other => (other.to_string(), Vec::new()),
        };
        ErrorResponse {
            status: "error",
            message,
            errors,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        json_response(status, self.body())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SipPayload {
    pub monthly_investment: Option<f64>,
    pub time_period_years: Option<i64>,
    pub annual_return_rate: Option<f64>,
    pub initial_investment: Option<f64>,
    pub annual_step_up_rate: Option<f64>,
    pub step_up_cap: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JourneyPayload {
    pub monthly_investment: Option<f64>,
    pub accumulation_years: Option<i64>,
    pub accumulation_return_rate: Option<f64>,
    pub initial_investment: Option<f64>,
    pub annual_step_up_rate: Option<f64>,
    pub step_up_cap: Option<f64>,
    pub monthly_withdrawal: Option<f64>,
    pub withdrawal_years: Option<i64>,
    pub withdrawal_return_rate: Option<f64>,
    pub withdrawal_step_up_rate: Option<f64>,
    pub withdrawal_step_up_cap: Option<f64>,
}

/// Collects "field required" errors so they are reported alongside range errors.
#[derive(Default)]
struct Required {
    missing: Vec<FieldError>,
}

impl Required {
    fn take<T: Default>(&mut self, field: &'static str, value: Option<T>) -> T {
        value.unwrap_or_else(|| {
            self.missing.push(FieldError::new(field, "field required"));
            T::default()
        })
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.missing.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError {
                errors: self.missing,
            })
        }
    }
}

/// Out-of-range year counts map to 0, which the year rule rejects.
fn whole_years(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl SipPayload {
    pub fn into_input(self) -> Result<CalculationInput, ValidationError> {
        let mut required = Required::default();
        let input = CalculationInput {
            monthly_investment: required.take("monthly_investment", self.monthly_investment),
            time_period_years: whole_years(required.take("time_period_years", self.time_period_years)),
            annual_return_rate: required.take("annual_return_rate", self.annual_return_rate),
            initial_investment: self.initial_investment.unwrap_or(0.0),
            annual_step_up_rate: self.annual_step_up_rate.unwrap_or(0.0),
            step_up_cap: self.step_up_cap,
        };
        required.finish(input)
    }
}

impl JourneyPayload {
    pub fn into_input(self) -> Result<JourneyInput, ValidationError> {
        let mut required = Required::default();
        let input = JourneyInput {
            monthly_investment: required.take("monthly_investment", self.monthly_investment),
            accumulation_years: whole_years(
                required.take("accumulation_years", self.accumulation_years),
            ),
            accumulation_return_rate: required
                .take("accumulation_return_rate", self.accumulation_return_rate),
            initial_investment: self.initial_investment.unwrap_or(0.0),
            annual_step_up_rate: self.annual_step_up_rate.unwrap_or(0.0),
            step_up_cap: self.step_up_cap,
            monthly_withdrawal: required.take("monthly_withdrawal", self.monthly_withdrawal),
            withdrawal_years: whole_years(required.take("withdrawal_years", self.withdrawal_years)),
            withdrawal_return_rate: required
                .take("withdrawal_return_rate", self.withdrawal_return_rate),
            withdrawal_step_up_rate: self.withdrawal_step_up_rate.unwrap_or(0.0),
            withdrawal_step_up_cap: self.withdrawal_step_up_cap,
        };
        required.finish(input)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundingFrequency {
    Annually,
}

#[derive(Debug, Serialize)]
pub struct SipInputsEcho<'a> {
    #[serde(flatten)]
    pub input: &'a CalculationInput,
    pub compounding_frequency: CompoundingFrequency,
}

#[derive(Debug, Serialize)]
pub struct SipResponse<'a> {
    pub status: &'static str,
    pub inputs: SipInputsEcho<'a>,
    pub results: &'a AccumulationSummary,
    pub yearly_breakdown: &'a [YearRecord],
}

impl<'a> SipResponse<'a> {
    pub fn new(input: &'a CalculationInput, result: &'a AccumulationResult) -> Self {
        Self {
            status: "success",
            inputs: SipInputsEcho {
                input,
                compounding_frequency: CompoundingFrequency::Annually,
            },
            results: &result.summary,
            yearly_breakdown: &result.yearly_breakdown,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JourneyResponse<'a> {
    pub status: &'static str,
    pub inputs: &'a JourneyInput,
    pub results: &'a JourneySummary,
    pub yearly_breakdown: &'a [JourneyYearRecord],
}

impl<'a> JourneyResponse<'a> {
    pub fn new(input: &'a JourneyInput, result: &'a JourneyResult) -> Self {
        Self {
            status: "success",
            inputs: input,
            results: &result.summary,
            yearly_breakdown: &result.yearly_breakdown,
        }
    }
}

#[derive(Debug, Serialize)]
struct Endpoints {
    calculate_sip: &'static str,
    money_journey: &'static str,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    message: &'static str,
    version: &'static str,
    endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/calculate-sip", post(calculate_sip_handler))
        .route("/api/money-journey", post(money_journey_handler))
        .fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(config.cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(&config);
    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, origins = ?config.allowed_origins, "SIP calculator API listening");

    axum::serve(listener, app).await
}

async fn index_handler() -> Response {
    json_response(
        StatusCode::OK,
        ServiceInfo {
            message: "Investment Growth Calculator API",
            version: env!("CARGO_PKG_VERSION"),
            endpoints: Endpoints {
                calculate_sip: "/api/calculate-sip",
                money_journey: "/api/money-journey",
            },
        },
    )
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, Health { status: "healthy" })
}

async fn not_found_handler() -> Response {
    ApiError::NotFound.into_response()
}

async fn calculate_sip_handler(
    payload: Result<Json<SipPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.inspect_err(|e| warn!(error = %e, "rejected SIP body"))?;
    let input = payload
        .into_input()
        .inspect_err(|e| warn!(error = %e, "rejected SIP input"))?;
    let result = accumulate(&input).inspect_err(|e| warn!(error = %e, "rejected SIP input"))?;

    debug!(
        years = input.time_period_years,
        future_value = result.summary.future_value,
        "calculated SIP projection"
    );
    Ok(json_response(StatusCode::OK, SipResponse::new(&input, &result)))
}

async fn money_journey_handler(
    payload: Result<Json<JourneyPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.inspect_err(|e| warn!(error = %e, "rejected journey body"))?;
    let input = payload
        .into_input()
        .inspect_err(|e| warn!(error = %e, "rejected journey input"))?;
    let result = run_journey(&input).inspect_err(|e| warn!(error = %e, "rejected journey input"))?;

    debug!(
        corpus = result.summary.corpus_at_retirement,
        depleted = result.summary.depleted,
        depletion_year = ?result.summary.depletion_year,
        "calculated money journey"
    );
    Ok(json_response(
        StatusCode::OK,
        JourneyResponse::new(&input, &result),
    ))
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(%detail, "request handler panicked");
    ApiError::Internal.into_response()
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}
