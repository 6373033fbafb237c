use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

impl PageQuery {
    pub fn validate(&self) -> AppResult<Page> {
        if self.page < 1 {
            return Err(AppError::bad_request("Invalid page number"));
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::bad_request("Invalid page size"));
        }
        // OFFSET must fit in an i64
        if (self.page - 1).checked_mul(self.page_size).is_none() {
            return Err(AppError::bad_request("Invalid page number"));
        }
        Ok(Page {
            number: self.page,
            size: self.page_size,
        })
    }
}

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page_number: i64,
    pub page_size: i64,
    pub total: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: Page, total: i64) -> Self {
        Self {
            data,
            page_number: page.number,
            page_size: page.size,
            total,
        }
    }
}
