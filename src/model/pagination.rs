use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 100;

/// Which page of a listing to return, taken from the `page_num` (1-based)
/// and `page_size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_num: usize,
    page_size: usize,
}

impl Pagination {
    pub fn new(page_num: usize, page_size: usize) -> Result<Self> {
        if page_num == 0 {
            return Err(Error::validation("page_num starts at 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self {
            page_num,
            page_size,
        })
    }

    pub fn skip(&self) -> u64 {
        ((self.page_num - 1) * self.page_size) as u64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn result(self, total: u64) -> PaginationResult {
        PaginationResult {
            page_num: self.page_num,
            page_size: self.page_size,
            total,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page_num = req.query_value::<usize>("page_num").unwrap_or(Ok(1));
        let page_size = req
            .query_value::<usize>("page_size")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE));
        let pagination = match (page_num, page_size) {
            (Ok(num), Ok(size)) => Self::new(num, size),
            _ => Err(Error::validation("page_num and page_size must be numbers")),
        };
        match pagination {
            Ok(pagination) => request::Outcome::Success(pagination),
            Err(e) => e.fail(req),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    pub page_num: usize,
    pub page_size: usize,
    pub total: u64,
}
