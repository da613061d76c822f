//! Repositories.
//!
//! Each repository wraps one table. Reads go through the shared connection;
//! writes that take part in a multi-step operation also come in an `_in`
//! variant taking any [`ConnectionTrait`], so callers can pass a
//! [`sea_orm::DatabaseTransaction`].

mod activity;
mod comment;
mod discussion;
mod feedback;
mod genre;
mod history;
mod movie;
mod notification;
mod rating;
mod reaction;
mod reply;
mod saved_movie;
mod user;
mod year;

pub use activity::{ActivityRepository, ActivityRow};
pub use comment::CommentRepository;
pub use discussion::DiscussionRepository;
pub use feedback::FeedbackRepository;
pub use genre::GenreRepository;
pub use history::HistoryRepository;
pub use movie::{MovieFilter, MovieRepository};
pub use notification::NotificationRepository;
pub use rating::RatingRepository;
pub use reaction::ReactionRepository;
pub use reply::ReplyRepository;
pub use saved_movie::SavedMovieRepository;
pub use user::UserRepository;
pub use year::YearRepository;

use cinelog_common::{AppError, AppResult};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::Serialize;

/// Highest offset PostgreSQL accepts (`bigint`).
const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Build a request, treating `None` and `0` as the first page.
    #[must_use]
    pub fn new(page: Option<u64>, per_page: u64) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            per_page: per_page.max(1),
        }
    }

    /// Rows to skip. Pages past the end saturate to an empty slice.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        let offset = (self.page - 1).saturating_mul(self.per_page);
        if offset > MAX_OFFSET { MAX_OFFSET } else { offset }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl<T> Page<T> {
    /// An empty first page.
    #[must_use]
    pub const fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            page: request.page,
            per_page: request.per_page,
            total: 0,
        }
    }

    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page)
    }

    /// Transform the items, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

/// Count the query, then fetch the requested slice.
pub async fn fetch_page<E, C>(
    conn: &C,
    query: Select<E>,
    request: PageRequest,
) -> AppResult<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
    C: ConnectionTrait,
{
    let total = query
        .clone()
        .count(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let items = query
        .offset(request.offset())
        .limit(request.per_page)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Page {
        items,
        page: request.page,
        per_page: request.per_page,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_to_first_page() {
        assert_eq!(PageRequest::new(None, 12).page, 1);
        assert_eq!(PageRequest::new(Some(0), 12).page, 1);
        assert_eq!(PageRequest::new(Some(3), 12).offset(), 24);
    }

    #[test]
    fn test_huge_page_offset_is_capped() {
        assert_eq!(PageRequest::new(Some(u64::MAX), 12).offset(), MAX_OFFSET);
        assert_eq!(PageRequest::new(Some(u64::MAX / 2), 3).offset(), MAX_OFFSET);
        assert_eq!(PageRequest::new(Some(2), u64::MAX).offset(), MAX_OFFSET);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page: Page<u8> = Page {
            items: vec![],
            page: 1,
            per_page: 5,
            total: 11,
        };
        assert_eq!(page.total_pages(), 3);
        assert_eq!(Page::<u8>::empty(PageRequest::new(None, 5)).total_pages(), 0);
    }
}
