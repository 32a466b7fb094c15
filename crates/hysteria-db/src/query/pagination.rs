//! Page metadata returned by `paginate`.

use serde::Serialize;

/// Derived page information for one `(page, limit, total)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub first_page: u64,
    pub is_empty: bool,
    pub last_page: u64,
    pub has_more_pages: bool,
    pub has_pages: bool,
}

impl PaginationMetadata {
    /// Computes the metadata. A zero limit is treated as one row per page.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let limit = limit.max(1);
        let last_page = total.div_ceil(limit).max(1);
        Self {
            total,
            per_page: limit,
            current_page: page,
            first_page: 1,
            is_empty: total == 0,
            last_page,
            has_more_pages: page < last_page,
            has_pages: last_page > 1,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedData<T> {
    pub pagination_metadata: PaginationMetadata,
    pub data: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_page_of_twenty_five() {
        let meta = PaginationMetadata::new(2, 10, 25);
        assert_eq!(
            meta,
            PaginationMetadata {
                total: 25,
                per_page: 10,
                current_page: 2,
                first_page: 1,
                is_empty: false,
                last_page: 3,
                has_more_pages: true,
                has_pages: true,
            }
        );
    }

    #[test]
    fn test_empty_table() {
        let meta = PaginationMetadata::new(1, 10, 0);
        assert!(meta.is_empty);
        assert_eq!(meta.last_page, 1);
        assert!(!meta.has_more_pages);
        assert!(!meta.has_pages);
    }

    #[test]
    fn test_exact_multiple_and_zero_limit() {
        assert_eq!(PaginationMetadata::new(2, 10, 20).last_page, 2);
        assert!(!PaginationMetadata::new(2, 10, 20).has_more_pages);
        assert_eq!(PaginationMetadata::new(1, 0, 3).per_page, 1);
        assert_eq!(PaginationMetadata::new(1, 0, 3).last_page, 3);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(PaginationMetadata::new(1, 5, 6)).unwrap();
        assert_eq!(json["perPage"], 5);
        assert_eq!(json["hasMorePages"], true);
        assert_eq!(json["lastPage"], 2);
    }
}
