mod handler;
mod model;

pub use handler::{create_user, remove_user, search_users, update_user};
pub use model::{CreateUserResponse, NearbyUserView, SearchQuery, UserLocationRequest};
