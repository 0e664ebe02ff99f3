use crate::error::{Axis, CoordinateError};
use crate::geo::Coordinate;

/// 小数点后允许的最大位数
pub const MAX_FRACTION_DIGITS: usize = 8;

/// 校验经纬度的范围和精度，通过后返回坐标
///
/// 边界值（±90 / ±180）是合法的。(0, 0) 在这里也是合法坐标，
/// 是否把它当作"未设置"由调用方决定，见 [`is_unset`]。
pub fn validate(latitude: f64, longitude: f64) -> Result<Coordinate, CoordinateError> {
    check_range(Axis::Latitude, latitude)?;
    check_range(Axis::Longitude, longitude)?;
    check_precision(Axis::Latitude, latitude)?;
    check_precision(Axis::Longitude, longitude)?;

    Ok(Coordinate::new(latitude, longitude))
}

/// 调用方策略：两个分量都为0时视为未设置
pub fn is_unset(coordinate: &Coordinate) -> bool {
    coordinate.latitude == 0.0 && coordinate.longitude == 0.0
}

fn check_range(axis: Axis, value: f64) -> Result<(), CoordinateError> {
    let limit = axis.limit();
    if !value.is_finite() || value < -limit || value > limit {
        return Err(CoordinateError::OutOfRange { axis, value, limit });
    }
    Ok(())
}

fn check_precision(axis: Axis, value: f64) -> Result<(), CoordinateError> {
    // f64的Display输出最短的可往返十进制表示，且不会使用科学计数法
    let repr = value.abs().to_string();
    let digits = repr.split_once('.').map_or(0, |(_, fraction)| fraction.len());
    if digits > MAX_FRACTION_DIGITS {
        return Err(CoordinateError::TooPrecise {
            axis,
            value,
            max_digits: MAX_FRACTION_DIGITS,
        });
    }
    Ok(())
}
