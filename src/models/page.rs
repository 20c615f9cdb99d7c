use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::client::Client;
use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::user::User;

/// Query string for paginated listings (`?page=N`, 1-based).
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: Option<i64>,
}

/// A page number that does not parse falls back to the first page.
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse::<i64>().ok()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Listings are paginated at a fixed size.
    pub const PER_PAGE: i64 = 5;

    /// Highest page whose offset still fits in an `i64`.
    const MAX_PAGE: i64 = i64::MAX / Self::PER_PAGE;

    pub fn new(page: Option<i64>) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(1).min(Self::MAX_PAGE),
            per_page: Self::PER_PAGE,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::new(query.page)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[aliases(UserPage = Page<User>, ClientPage = Page<Client>, ProjectPage = Page<Project>, TaskPage = Page<Task>)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: i64) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            (total + request.per_page - 1) / request.per_page
        };

        Self {
            data,
            current_page: request.page,
            per_page: request.per_page,
            total,
            last_page,
        }
    }
}
