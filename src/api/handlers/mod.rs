pub mod criteria;
pub mod earnings;
pub mod health;
pub mod limits;
pub mod metrics;
pub mod recommendations;

use serde::Serialize;

/// Standard response envelope for list/detail endpoints.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
