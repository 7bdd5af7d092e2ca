//! Offset pagination shared by every list endpoint

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ResponseMetadata;

/// Hard upper bound on `limit`
pub const MAX_LIMIT: i64 = 100;

/// Default page size for health logs
pub const DEFAULT_LOG_LIMIT: i64 = 100;

/// Default page size for reports
pub const DEFAULT_REPORT_LIMIT: i64 = 50;

/// `skip`/`limit` query parameters
#[derive(Debug, Deserialize, IntoParams, Clone, Copy, Default)]
pub struct SkipLimit {
    #[param(example = 0, minimum = 0)]
    pub skip: Option<i64>,

    #[param(example = 50, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

/// Resolved window passed to the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Self {
        SkipLimit {
            skip: Some(skip),
            limit: Some(limit),
        }
        .page(limit)
    }

    /// Everything from the start, up to `limit` entries
    pub fn first(limit: i64) -> Self {
        Self::new(0, limit)
    }

    pub fn skip_usize(&self) -> usize {
        usize::try_from(self.skip).unwrap_or(0)
    }

    pub fn limit_usize(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(0)
    }

    pub fn to_metadata(&self, returned: usize) -> ResponseMetadata {
        ResponseMetadata {
            skip: self.skip,
            limit: self.limit,
            returned,
        }
    }
}

impl SkipLimit {
    /// Negative skip becomes 0; limit is clamped to `1..=100`
    pub fn page(&self, default_limit: i64) -> Page {
        Page {
            skip: self.skip.unwrap_or(0).max(0),
            limit: self.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults_per_collection() {
        let params = SkipLimit::default();
        assert_eq!(params.page(DEFAULT_LOG_LIMIT), Page { skip: 0, limit: 100 });
        assert_eq!(params.page(DEFAULT_REPORT_LIMIT), Page { skip: 0, limit: 50 });
    }

    #[test]
    fn test_limit_capped() {
        let params = SkipLimit {
            skip: Some(100),
            limit: Some(500),
        };
        assert_eq!(params.page(DEFAULT_LOG_LIMIT), Page { skip: 100, limit: 100 });
    }

    #[test]
    fn test_metadata_reports_window() {
        let metadata = Page::new(100, 100).to_metadata(50);
        assert_eq!(metadata.skip, 100);
        assert_eq!(metadata.limit, 100);
        assert_eq!(metadata.returned, 50);
    }

    proptest! {
        #[test]
        fn page_is_always_within_bounds(skip in any::<Option<i64>>(), limit in any::<Option<i64>>()) {
            let page = SkipLimit { skip, limit }.page(DEFAULT_REPORT_LIMIT);
            prop_assert!(page.skip >= 0);
            prop_assert!((1..=MAX_LIMIT).contains(&page.limit));
        }
    }
}
