//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::dashboards::{self, Dashboard, DashboardOutput, Upload};
use crate::error::{DashError, DashResult};
use crate::excel::XLSX_MIME;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// A failed request, rendered as an `ApiResponse` error body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<DashError> for ApiError {
    fn from(e: DashError) -> Self {
        let status = if e.is_input_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::err(self.message);
        warn!(request_id = %body.request_id, status = %self.status, error = ?body.error, "request failed");
        (self.status, Json(body)).into_response()
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
    /// Multipart file fields the endpoint expects
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl EndpointInfo {
    fn get(path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: "GET".to_string(),
            description: description.to_string(),
            fields: Vec::new(),
        }
    }

    fn dashboard(dashboard: Dashboard) -> Self {
        Self {
            path: format!("/api/v1/{}", dashboard.name()),
            method: "POST".to_string(),
            description: dashboard.title().to_string(),
            fields: dashboard.inputs().iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut endpoints = vec![
        EndpointInfo::get("/health", "Health check endpoint"),
        EndpointInfo::get("/version", "Get server version"),
    ];
    endpoints.extend(Dashboard::ALL.into_iter().map(EndpointInfo::dashboard));

    Json(ApiResponse::ok(RootResponse {
        name: "itdash server".to_string(),
        version: state.version.clone(),
        description: "Upload monthly Excel exports, download the updated dashboard workbook".to_string(),
        endpoints,
    }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub dashboards: Vec<Dashboard>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        dashboards: Dashboard::ALL.to_vec(),
    }))
}

//==============================================================================
// Uploads
//==============================================================================

/// File fields of one multipart request, in arrival order
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: Vec<(String, Upload)>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}.xlsx", name));
            let bytes = field.bytes().await?;
            form.push(name, Upload::new(file_name, bytes.to_vec()));
        }
        Ok(form)
    }

    pub fn push(&mut self, field: impl Into<String>, upload: Upload) {
        self.fields.push((field.into(), upload));
    }

    /// Remove the single upload for `field`
    pub fn take(&mut self, field: &str) -> DashResult<Upload> {
        let pos = self
            .fields
            .iter()
            .position(|(name, _)| name == field)
            .ok_or_else(|| DashError::InvalidInput(format!("missing file field '{}'", field)))?;
        Ok(self.fields.remove(pos).1)
    }

    /// Remove every upload for `field`, in arrival order
    pub fn take_all(&mut self, field: &str) -> Vec<Upload> {
        let (taken, rest) = std::mem::take(&mut self.fields)
            .into_iter()
            .partition(|(name, _)| name == field);
        self.fields = rest;
        taken.into_iter().map(|(_, upload)| upload).collect()
    }
}

/// Run a transform on a blocking thread and answer with the workbook
async fn render<F>(dashboard: Dashboard, job: F) -> Result<Response, ApiError>
where
    F: FnOnce() -> DashResult<DashboardOutput> + Send + 'static,
{
    let output = tokio::task::spawn_blocking(job).await.map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("{} transform aborted: {}", dashboard, e),
    })??;

    info!(
        dashboard = %dashboard,
        rows = output.rows_appended,
        bytes = output.bytes.len(),
        file = %output.file_name,
        "rendered workbook"
    );
    Ok(workbook_response(output))
}

/// Build the attachment response for a rendered workbook
pub fn workbook_response(output: DashboardOutput) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", output.file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::HeaderName::from_static("x-rows-appended"), output.rows_appended.to_string()),
        ],
        output.bytes,
    )
        .into_response()
}

/// POST /api/v1/aging - fields `powerbi`, `raw`
pub async fn aging(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let powerbi = form.take("powerbi")?;
    let raw = form.take("raw")?;
    let config = Arc::clone(&state.config);
    render(Dashboard::Aging, move || {
        dashboards::aging::run(powerbi, raw, &config.aging, Local::now().naive_local())
    })
    .await
}

/// POST /api/v1/cockpit - fields `raw`, `kpi`
pub async fn cockpit(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let raw = form.take("raw")?;
    let kpi = form.take("kpi")?;
    let config = Arc::clone(&state.config);
    render(Dashboard::Cockpit, move || dashboards::cockpit::run(raw, kpi, &config.cockpit)).await
}

/// POST /api/v1/stability - repeated field `source`, field `target`
pub async fn stability(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let sources = form.take_all("source");
    let target = form.take("target")?;
    let config = Arc::clone(&state.config);
    render(Dashboard::Stability, move || {
        dashboards::stability::run(sources, target, &config.stability)
    })
    .await
}

/// POST /api/v1/toxic - fields `manual`, `new`
pub async fn toxic(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let manual = form.take("manual")?;
    let new = form.take("new")?;
    let config = Arc::clone(&state.config);
    render(Dashboard::Toxic, move || {
        dashboards::toxic::run(manual, new, &config.toxic, Local::now().naive_local())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_err_has_no_data() {
        let response = ApiResponse::<()>::err("boom");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_input_errors_map_to_422() {
        let err: ApiError = DashError::NoPeriod {
            sheet: "KPI2".to_string(),
            column: "Date".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = DashError::Write("disk".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_form_take_and_take_all() {
        let mut form = UploadForm::default();
        form.push("source", Upload::new("a.xlsx", vec![1]));
        form.push("target", Upload::new("t.xlsx", vec![2]));
        form.push("source", Upload::new("b.xlsx", vec![3]));

        let sources = form.take_all("source");
        let names: Vec<&str> = sources.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["a.xlsx", "b.xlsx"]);
        assert_eq!(form.take("target").unwrap().bytes, vec![2]);

        let err = form.take("target").unwrap_err();
        assert!(err.to_string().contains("missing file field 'target'"));
    }

    #[test]
    fn test_workbook_response_headers() {
        let response = workbook_response(DashboardOutput {
            dashboard: Dashboard::Aging,
            file_name: "Updated_PowerBI_ITSM.xlsx".to_string(),
            bytes: vec![0, 1, 2],
            rows_appended: 27,
            period: None,
            summary: String::new(),
        });
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], XLSX_MIME);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Updated_PowerBI_ITSM.xlsx\""
        );
        assert_eq!(headers["x-rows-appended"], "27");
    }
}
