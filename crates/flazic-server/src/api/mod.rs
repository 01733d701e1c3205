pub mod comments;
pub mod events;
pub mod follows;
pub mod notifications;
pub mod playlists;
pub mod social_links;
pub mod tracks;
pub mod users;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Clamped (page, per_page): page is 1-based, per_page capped at 100
    pub fn clamp(&self) -> (u64, u64) {
        (
            self.page.unwrap_or(1).max(1),
            self.per_page.unwrap_or(20).clamp(1, 100),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        Self {
            data,
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Reject URL fields that are not plain http(s) links.
pub fn validate_url(field: &str, url: &str) -> Result<(), ApiError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "{field} must start with http:// or https://"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams {
            page: None,
            per_page: None,
        };
        assert_eq!(params.clamp(), (1, 20));
    }

    #[test]
    fn test_pagination_clamped() {
        let params = PaginationParams {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(params.clamp(), (1, 100));
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let resp = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(resp.total_pages, 3);
        let empty: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("audio_url", "https://cdn.example.com/a.mp3").is_ok());
        assert!(validate_url("audio_url", "http://example.com/a.mp3").is_ok());
        assert!(validate_url("audio_url", "ftp://example.com/a.mp3").is_err());
        assert!(validate_url("audio_url", "javascript:alert(1)").is_err());
        assert!(validate_url("audio_url", "").is_err());
    }
}
