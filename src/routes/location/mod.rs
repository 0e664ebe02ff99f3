mod handler;
mod model;

pub use handler::{calculate_distance, register_location};
pub use model::{DistanceQuery, DistanceResponse, LocationRecord, RegisterLocationRequest, RegisterLocationResponse};
