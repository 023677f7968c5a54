/// Filter, sort, and pagination primitives
///
/// This module provides the building blocks shared by every listing endpoint:
/// validated page parameters, sort direction, and the pagination envelope
/// returned to clients.
///
/// # Pagination contract
///
/// - Pages are 1-based.
/// - `last_page = ceil(total / per_page)`, never below 1.
/// - Requesting a page beyond the last page yields an empty data set with
///   metadata still reflecting the true total.
///
/// # Example
///
/// ```
/// use resourcex_shared::query::{PageParams, PageMeta};
///
/// let params = PageParams::new(Some(3), Some(10)).unwrap();
/// assert_eq!(params.offset(), 20);
///
/// let meta = PageMeta::new(42, &params);
/// assert_eq!(meta.last_page, 5);
/// ```
use serde::{Deserialize, Serialize};

/// Default page size when the caller does not specify one
pub const DEFAULT_PER_PAGE: i64 = 15;

/// Upper bound on page size to keep result sets bounded
pub const MAX_PER_PAGE: i64 = 100;

/// Error type for query parameter validation
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Page number is zero or negative
    #[error("page must be a positive integer")]
    InvalidPage,

    /// Page size is out of the accepted range
    #[error("perPage must be between 1 and {MAX_PER_PAGE}")]
    InvalidPerPage,

    /// Sort field is not in the allowlist for this listing
    #[error("unknown sort field: {0}")]
    UnknownSortField(String),

    /// A filter value is not part of its enumerated domain
    #[error("invalid value for {field}: {value}")]
    InvalidFilterValue { field: &'static str, value: String },
}

impl QueryError {
    /// The request field this error refers to, for per-field error reporting
    pub fn field(&self) -> &'static str {
        match self {
            QueryError::InvalidPage => "page",
            QueryError::InvalidPerPage => "perPage",
            QueryError::UnknownSortField(_) => "sortBy",
            QueryError::InvalidFilterValue { field, .. } => field,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl SortOrder {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Parses a direction from its wire representation
    ///
    /// Anything other than "asc"/"desc" (case-insensitive) is rejected.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryError::InvalidFilterValue {
                field: "sortOrder",
                value: value.to_string(),
            }),
        }
    }
}

/// Validated pagination parameters
///
/// Only constructible through [`PageParams::new`] (or `Default`), so a page
/// size outside 1..=MAX_PER_PAGE cannot reach the offset and last-page
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    page: i64,
    per_page: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageParams {
    /// Builds validated page parameters from raw request values
    ///
    /// Absent values take their defaults (page 1, 15 per page).
    ///
    /// # Errors
    ///
    /// Returns `QueryError::InvalidPage` for page < 1 and
    /// `QueryError::InvalidPerPage` for per_page outside 1..=100.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Result<Self, QueryError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(QueryError::InvalidPage);
        }

        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(QueryError::InvalidPerPage);
        }

        Ok(Self { page, per_page })
    }

    /// 1-based page number
    pub fn page(&self) -> i64 {
        self.page
    }

    /// Page size (always in 1..=MAX_PER_PAGE)
    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Row offset for this page
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Pagination metadata returned alongside every listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// The page that was requested
    pub current_page: i64,

    /// Last page that contains data (1 when the set is empty)
    pub last_page: i64,

    /// Page size used for this listing
    pub per_page: i64,

    /// Total matching records across all pages
    pub total: i64,
}

impl PageMeta {
    /// Computes metadata for a total count and page parameters
    pub fn new(total: i64, params: &PageParams) -> Self {
        let last_page = ((total + params.per_page - 1) / params.per_page).max(1);
        Self {
            current_page: params.page,
            last_page,
            per_page: params.per_page,
            total,
        }
    }
}

/// A page of records plus its pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Records on this page (may be empty past the last page)
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PageMeta,
}

/// Parses a comma-separated multi-value filter parameter
///
/// Empty segments are ignored, so `"completed,,cancelled"` and
/// `"completed,cancelled"` parse identically. An empty input yields an empty
/// vector (filter absent).
///
/// The per-value parser reports domain violations with the owning field name.
pub fn parse_multi<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Result<T, QueryError>,
) -> Result<Vec<T>, QueryError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse)
        .collect()
}
