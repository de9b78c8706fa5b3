//! Bulk fan-out endpoints: one backend call per student, issued
//! concurrently with no coordination beyond collecting the results. A
//! failed item never fails the batch; callers get per-item outcomes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::SessionCredential;
use crate::tenant::TenantContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BulkAttendanceRequest {
    /// ISO date the attendance applies to.
    pub date: String,
    pub class_id: Option<Uuid>,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: Uuid,
    /// present / absent / late / excused - validated by the backend.
    pub status: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkPromotionRequest {
    pub from_class_id: Uuid,
    pub to_class_id: Uuid,
    pub academic_year_id: Uuid,
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct ItemOutcome {
    student_id: Uuid,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ItemOutcome {
    fn from_result(
        student_id: Uuid,
        result: Result<(StatusCode, Value), crate::services::BackendError>,
    ) -> Self {
        match result {
            Ok((status, body)) => Self {
                student_id,
                succeeded: status.is_success(),
                status: Some(status.as_u16()),
                error: if status.is_success() {
                    None
                } else {
                    body.get("message")
                        .or_else(|| body.get("error"))
                        .and_then(Value::as_str)
                        .map(|s| s.to_string())
                },
            },
            Err(e) => Self {
                student_id,
                succeeded: false,
                status: None,
                error: Some(e.to_string()),
            },
        }
    }
}

fn summarize(outcomes: Vec<ItemOutcome>) -> Json<Value> {
    let total = outcomes.len();
    let succeeded = outcomes.iter().filter(|o| o.succeeded).count();

    Json(json!({
        "success": true,
        "data": {
            "total": total,
            "succeeded": succeeded,
            "failed": total - succeeded,
            "results": outcomes,
        }
    }))
}

fn check_batch_size(len: usize, max: usize) -> Result<(), ApiError> {
    if len == 0 {
        return Err(ApiError::bad_request("Batch is empty"));
    }
    if len > max {
        return Err(ApiError::bad_request(format!(
            "Batch of {} exceeds the limit of {} items",
            len, max
        )));
    }
    Ok(())
}

/// POST /api/attendance/bulk - record attendance for a whole class in one
/// request, fanning out one backend call per student.
pub async fn attendance_bulk(
    State(state): State<AppState>,
    Extension(credential): Extension<SessionCredential>,
    Extension(tenant): Extension<TenantContext>,
    Json(request): Json<BulkAttendanceRequest>,
) -> Result<Json<Value>, ApiError> {
    check_batch_size(request.records.len(), state.config.api.max_bulk_items)?;

    let calls = request.records.iter().map(|record| {
        let payload = json!({
            "studentId": record.student_id,
            "classId": request.class_id,
            "date": request.date,
            "status": record.status,
            "remarks": record.remarks,
        });
        let backend = &state.backend;
        let credential = &credential;
        let tenant = &tenant;
        async move {
            let result = backend
                .post_json("/api/v1/attendance", &payload, credential, tenant)
                .await;
            ItemOutcome::from_result(record.student_id, result)
        }
    });

    let outcomes = join_all(calls).await;
    tracing::info!(
        count = outcomes.len(),
        "bulk attendance fan-out complete"
    );
    Ok(summarize(outcomes))
}

/// POST /api/promotions/bulk - promote a set of students to the next class,
/// one backend call per student.
pub async fn promotions_bulk(
    State(state): State<AppState>,
    Extension(credential): Extension<SessionCredential>,
    Extension(tenant): Extension<TenantContext>,
    Json(request): Json<BulkPromotionRequest>,
) -> Result<Json<Value>, ApiError> {
    check_batch_size(request.student_ids.len(), state.config.api.max_bulk_items)?;

    let calls = request.student_ids.iter().map(|student_id| {
        let payload = json!({
            "studentId": student_id,
            "fromClassId": request.from_class_id,
            "toClassId": request.to_class_id,
            "academicYearId": request.academic_year_id,
        });
        let backend = &state.backend;
        let credential = &credential;
        let tenant = &tenant;
        let student_id = *student_id;
        async move {
            let result = backend
                .post_json("/api/v1/promotions", &payload, credential, tenant)
                .await;
            ItemOutcome::from_result(student_id, result)
        }
    });

    let outcomes = join_all(calls).await;
    tracing::info!(count = outcomes.len(), "bulk promotion fan-out complete");
    Ok(summarize(outcomes))
}
