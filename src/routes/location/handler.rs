use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};

use crate::{
    AppState,
    utils::{ApiResponse, error_codes, error_to_api_response, parse_timestamp, success_to_api_response},
};

use super::model::{DistanceQuery, DistanceResponse, RegisterLocationRequest, RegisterLocationResponse};

// 解析可选的时间参数，空字符串视为未提供
fn optional_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_timestamp(raw).map(Some),
        None => Ok(None),
    }
}

// 注册位置API
#[axum::debug_handler]
pub async fn register_location(
    State(state): State<AppState>,
    Json(request): Json<RegisterLocationRequest>,
) -> Json<ApiResponse<RegisterLocationResponse>> {
    if request.user_id.trim().is_empty() {
        return error_to_api_response(error_codes::VALIDATION_ERROR, "缺少user_id参数".into());
    }

    let timestamp = match optional_timestamp(request.timestamp.as_deref()) {
        Ok(timestamp) => timestamp.unwrap_or_else(Utc::now),
        Err(err) => {
            return error_to_api_response(
                error_codes::VALIDATION_ERROR,
                format!("时间格式无效: {}", err),
            );
        }
    };

    let registered = state
        .service
        .register_location(&request.user_id, request.coordinate, timestamp)
        .await;
    match registered {
        Ok(history) => {
            success_to_api_response(RegisterLocationResponse::new(request.user_id, &history))
        }
        Err(err) => {
            tracing::error!("注册位置错误: {:?}", err);
            error_to_api_response(err.error_code(), err.to_string())
        }
    }
}

// 计算移动距离API
#[axum::debug_handler]
pub async fn calculate_distance(
    State(state): State<AppState>,
    Query(query): Query<DistanceQuery>,
) -> Json<ApiResponse<DistanceResponse>> {
    let user_id = match query.user_id.filter(|id| !id.trim().is_empty()) {
        Some(user_id) => user_id,
        None => return error_to_api_response(error_codes::VALIDATION_ERROR, "缺少user_id参数".into()),
    };

    let window = optional_timestamp(query.start.as_deref())
        .and_then(|start| optional_timestamp(query.end.as_deref()).map(|end| (start, end)));
    let (start, end) = match window {
        Ok(window) => window,
        Err(err) => {
            return error_to_api_response(
                error_codes::VALIDATION_ERROR,
                format!("时间格式无效: {}", err),
            );
        }
    };

    let calculated = state.service.calculate_distance(&user_id, start, end).await;
    match calculated {
        Ok(result) => success_to_api_response(DistanceResponse::new(user_id, &result)),
        Err(err) => {
            tracing::warn!("计算距离错误: {}", err);
            error_to_api_response(err.error_code(), err.to_string())
        }
    }
}
