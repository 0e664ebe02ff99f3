// 用户目录
// 保存用户ID和用户名，创建用户和按用户名更新位置时为位置服务提供输入

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::error::UserError;
use crate::geo::Coordinate;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: String,
    pub coordinate: Coordinate,
}

#[derive(Default)]
struct Directory {
    by_id: HashMap<String, UserProfile>,
    // 用户名 -> 用户ID
    by_name: HashMap<String, String>,
}

#[derive(Default)]
pub struct UserDirectory {
    inner: RwLock<Directory>,
}

/// 用户名为4到16个字母或数字
pub fn validate_user_name(user_name: &str) -> Result<(), UserError> {
    let length = user_name.chars().count();
    if !(4..=16).contains(&length) {
        return Err(UserError::UserNameLength);
    }
    if !user_name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(UserError::UserNameCharset);
    }
    Ok(())
}

// 目录层把 (0, 0) 视为客户端没有提供位置
fn checked_coordinate(coordinate: Coordinate) -> Result<Coordinate, UserError> {
    if validation::is_unset(&coordinate) {
        return Err(UserError::UnsetCoordinate);
    }
    Ok(validation::validate(
        coordinate.latitude,
        coordinate.longitude,
    )?)
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_user(
        &self,
        user_name: &str,
        coordinate: Coordinate,
    ) -> Result<UserProfile, UserError> {
        validate_user_name(user_name)?;
        let coordinate = checked_coordinate(coordinate)?;

        let mut directory = self.inner.write();
        if directory.by_name.contains_key(user_name) {
            return Err(UserError::UserExists(user_name.to_string()));
        }

        let profile = UserProfile {
            user_id: Uuid::new_v4().to_string(),
            user_name: user_name.to_string(),
            coordinate,
        };
        directory
            .by_name
            .insert(profile.user_name.clone(), profile.user_id.clone());
        directory
            .by_id
            .insert(profile.user_id.clone(), profile.clone());

        tracing::info!(user_id = %profile.user_id, user_name, "user created");
        Ok(profile)
    }

    /// 按用户名更新当前位置
    pub fn update_location(
        &self,
        user_name: &str,
        coordinate: Coordinate,
    ) -> Result<UserProfile, UserError> {
        let coordinate = checked_coordinate(coordinate)?;

        let mut directory = self.inner.write();
        let user_id = directory
            .by_name
            .get(user_name)
            .cloned()
            .ok_or_else(|| UserError::NotFound(user_name.to_string()))?;
        let profile = directory
            .by_id
            .get_mut(&user_id)
            .ok_or_else(|| UserError::NotFound(user_name.to_string()))?;
        profile.coordinate = coordinate;

        Ok(profile.clone())
    }

    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.inner.read().by_id.get(user_id).cloned()
    }

    pub fn remove(&self, user_id: &str) -> Option<UserProfile> {
        let mut directory = self.inner.write();
        let profile = directory.by_id.remove(user_id)?;
        directory.by_name.remove(&profile.user_name);
        Some(profile)
    }
}
