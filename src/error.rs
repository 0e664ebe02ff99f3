use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::utils::error_codes;

/// 坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// 坐标轴允许的绝对值上限
    pub const fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => f.write_str("latitude"),
            Axis::Longitude => f.write_str("longitude"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("{axis} must be between -{limit} and {limit}, got {value}")]
    OutOfRange { axis: Axis, value: f64, limit: f64 },

    #[error("{axis} {value} has more than {max_digits} decimal places")]
    TooPrecise {
        axis: Axis,
        value: f64,
        max_digits: usize,
    },
}

/// 存储协作方的失败，原样向上传递
#[derive(Debug, Error)]
pub enum StoreFailure {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("there is no user with such id: {0}")]
    UserNotFound(String),

    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("user store failure: {0}")]
    UserStoreFailure(#[from] StoreFailure),
}

impl LocationError {
    /// 映射为API错误码
    pub fn error_code(&self) -> i32 {
        match self {
            LocationError::InvalidCoordinate(_) | LocationError::InvalidWindow { .. } => {
                error_codes::VALIDATION_ERROR
            }
            LocationError::UserNotFound(_) => error_codes::NOT_FOUND,
            LocationError::UserStoreFailure(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("username must be between 4 and 16 characters")]
    UserNameLength,

    #[error("username can only contain alphanumeric characters")]
    UserNameCharset,

    #[error("user name {0} is already taken")]
    UserExists(String),

    #[error("user {0} not found")]
    NotFound(String),

    #[error("invalid location data")]
    UnsetCoordinate,

    #[error(transparent)]
    Location(#[from] LocationError),
}

impl From<CoordinateError> for UserError {
    fn from(err: CoordinateError) -> Self {
        UserError::Location(LocationError::InvalidCoordinate(err))
    }
}

impl UserError {
    pub fn error_code(&self) -> i32 {
        match self {
            UserError::UserNameLength | UserError::UserNameCharset | UserError::UnsetCoordinate => {
                error_codes::VALIDATION_ERROR
            }
            UserError::UserExists(_) => error_codes::USER_EXISTS,
            UserError::NotFound(_) => error_codes::NOT_FOUND,
            UserError::Location(err) => err.error_code(),
        }
    }
}

#[derive(Debug, Error)]
#[error("ingestion queue is closed")]
pub struct IngestClosed;
