use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;

use crate::{
    AppState,
    ingest::LocationEvent,
    routes::location::LocationRecord,
    users::UserProfile,
    utils::{ApiResponse, error_codes, error_to_api_response, success_to_api_response},
    validation,
};

use super::model::{CreateUserResponse, NearbyUserView, SearchQuery, UserLocationRequest};

// 创建用户并记录初始位置
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<UserLocationRequest>,
) -> Json<ApiResponse<CreateUserResponse>> {
    let user = match state.users.create_user(&request.user_name, request.coordinate) {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!("创建用户失败: {}", err);
            return error_to_api_response(err.error_code(), err.to_string());
        }
    };

    let registered = state
        .service
        .register_location(&user.user_id, user.coordinate, Utc::now())
        .await;
    match registered {
        Ok(history) => success_to_api_response(CreateUserResponse {
            location_records: history.iter().map(LocationRecord::from).collect(),
            user,
        }),
        Err(err) => {
            tracing::error!("注册初始位置错误: {:?}", err);
            error_to_api_response(err.error_code(), err.to_string())
        }
    }
}

// 按用户名更新位置，位置历史通过事件队列异步写入
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Json(request): Json<UserLocationRequest>,
) -> Json<ApiResponse<UserProfile>> {
    let user = match state
        .users
        .update_location(&request.user_name, request.coordinate)
    {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!("更新用户失败: {}", err);
            return error_to_api_response(err.error_code(), err.to_string());
        }
    };

    let event = LocationEvent {
        user_id: user.user_id.clone(),
        coordinate: user.coordinate,
    };
    match state.ingest.publish(event).await {
        Ok(()) => success_to_api_response(user),
        Err(err) => {
            tracing::error!("发布位置事件错误: {}", err);
            error_to_api_response(error_codes::INTERNAL_ERROR, "更新位置失败".into())
        }
    }
}

// 获取附近用户API
#[axum::debug_handler]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<ApiResponse<Vec<NearbyUserView>>> {
    let (latitude, longitude) = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return error_to_api_response(error_codes::VALIDATION_ERROR, "缺少lat或lon参数".into());
        }
    };

    let center = match validation::validate(latitude, longitude) {
        Ok(center) => center,
        Err(err) => return error_to_api_response(error_codes::VALIDATION_ERROR, err.to_string()),
    };

    if let Some(radius) = query.r {
        if !radius.is_finite() || radius > state.config.max_search_radius_km {
            return error_to_api_response(
                error_codes::VALIDATION_ERROR,
                format!("搜索半径无效，最大为{}公里", state.config.max_search_radius_km),
            );
        }
    }

    let nearby = state
        .service
        .search_nearby_detailed(&center, query.r)
        .into_iter()
        .map(|user| NearbyUserView {
            user_name: state.users.get(&user.user_id).map(|p| p.user_name),
            user_id: user.user_id,
            coordinate: user.coordinate,
            distance_km: user.distance_km,
            last_updated: user.last_updated,
        })
        .collect();

    success_to_api_response(nearby)
}

// 删除用户：清除位置历史、附近快照和目录记录
#[axum::debug_handler]
pub async fn remove_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<ApiResponse<String>> {
    // 先删历史和快照，成功后再删目录项，存储失败时用户仍可重试删除
    let removed = state.service.remove_user(&user_id).await;
    match removed {
        Ok(existed) => {
            let in_directory = state.users.remove(&user_id).is_some();
            if existed || in_directory {
                success_to_api_response(user_id)
            } else {
                error_to_api_response(error_codes::NOT_FOUND, format!("用户{}不存在", user_id))
            }
        }
        Err(err) => {
            tracing::error!("删除用户错误: {:?}", err);
            error_to_api_response(err.error_code(), err.to_string())
        }
    }
}
