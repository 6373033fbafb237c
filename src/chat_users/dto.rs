use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct CreateChatUserRequest {
    pub id: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl CreateChatUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        if !present(&self.gender) || !present(&self.occupation) {
            return Err(AppError::bad_request("Gender and Occupation are required"));
        }
        if self.age.map_or(true, |age| age <= 0) {
            return Err(AppError::bad_request("Age must be greater than 0"));
        }
        if self.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(AppError::bad_request("Chat user id cannot be blank"));
        }
        Ok(())
    }
}
