use serde::{Deserialize, Serialize};

const MAX_LIMIT: i64 = 100;

/// Raw `?page=&limit=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated offset window over a listing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub skip: i64,
    pub take: i64,
}

impl Pagination {
    /// Resolve query parameters, using `default_limit` when no limit is given
    pub fn from_query(query: &PageQuery, default_limit: i64) -> Result<Self, String> {
        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(default_limit);

        let invalid = || "Invalid pagination parameters".to_string();
        if page < 1 || !(1..=MAX_LIMIT).contains(&limit) {
            return Err(invalid());
        }
        let skip = (page - 1).checked_mul(limit).ok_or_else(invalid)?;

        Ok(Self { skip, take: limit })
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PageInfo {
    pub total: i64,
    pub skip: i64,
    pub take: i64,
    pub pages: i64,
}

/// A page of results along with its position in the full listing
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, window: Pagination) -> Self {
        // Ceiling division; `take` is never zero
        let pages = (total + window.take - 1) / window.take;
        Self {
            data,
            pagination: PageInfo {
                total,
                skip: window.skip,
                take: window.take,
                pages,
            },
        }
    }
}
