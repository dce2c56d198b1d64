use crate::error::ReconcileError;
use crate::models::Reconciliation;
use crate::report::write_allocation_csv;
use crate::service::ReconcileService;
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 原始发票文本 (每行一个金额) 与付款金额文本
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub invoices: String,
    pub payment: String,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub result: Option<Reconciliation>,
    pub computed_at: DateTime<Utc>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 在阻塞线程池中执行对账，避免指数级搜索占用异步运行时
async fn compute(
    service: Arc<ReconcileService>,
    req: ReconcileRequest,
) -> Result<Reconciliation, (StatusCode, String)> {
    let joined =
        tokio::task::spawn_blocking(move || service.reconcile(&req.invoices, &req.payment)).await;

    match joined {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => {
            tracing::warn!("Reconciliation rejected: {}", e);
            Err((status_for(&e), e.to_string()))
        }
        Err(e) => {
            tracing::error!("Reconciliation task failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)))
        }
    }
}

fn status_for(err: &ReconcileError) -> StatusCode {
    match err {
        ReconcileError::NoValidInvoices
        | ReconcileError::InvalidPayment { .. }
        | ReconcileError::TooManyInvoices { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    let response = ReconcileResponse {
        success: false,
        message,
        result: None,
        computed_at: Utc::now(),
    };
    (status, Json(response)).into_response()
}

/// 对账接口: 返回匹配组合与先到先付分配结果
pub async fn reconcile(
    State(service): State<Arc<ReconcileService>>,
    Json(req): Json<ReconcileRequest>,
) -> Response {
    match compute(service, req).await {
        Ok(result) => {
            let message = if result.has_matches() {
                format!("Found {} matching combination(s)", result.matches.len())
            } else {
                "No matching combination found, see oldest-first allocation".to_string()
            };
            let response = ReconcileResponse {
                success: true,
                message,
                result: Some(result),
                computed_at: Utc::now(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err((status, message)) => failure(status, message),
    }
}

/// 导出接口: 以 CSV 返回先到先付分配明细
pub async fn export_allocation(
    State(service): State<Arc<ReconcileService>>,
    Json(req): Json<ReconcileRequest>,
) -> Response {
    let result = match compute(service, req).await {
        Ok(result) => result,
        Err((status, message)) => return failure(status, message),
    };

    let mut body = Vec::new();
    if let Err(e) = write_allocation_csv(&result, &mut body) {
        tracing::error!("CSV export failed: {}", e);
        return failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e));
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        body,
    )
        .into_response()
}
