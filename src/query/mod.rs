//! List query state and its wire encoding.

use std::collections::BTreeMap;

/// Filter value meaning "no filter".
pub const ALL: &str = "all";

/// Filters, pagination and sort order driving one list fetch.
///
/// `page` is 0-based here and 1-based on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub filters: BTreeMap<String, String>,
    pub page: u32,
    pub page_size: u32,
    pub sort_key: Option<String>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(25)
    }
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            filters: BTreeMap::new(),
            page: 0,
            page_size: page_size.max(1),
            sort_key: None,
        }
    }

    /// Set a filter and go back to the first page.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_filter(key, value);
        self
    }

    pub fn with_sort(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
        self.page = 0;
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
        self.page = 0;
    }

    /// Query parameters as sent to the backend.
    ///
    /// Filters equal to `"all"` or blank are left out entirely.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .filter(|(_, value)| is_active_filter(value))
            .map(|(key, value)| (key.clone(), value.trim().to_string()))
            .collect();

        params.push(("page".to_string(), (u64::from(self.page) + 1).to_string()));
        params.push(("limit".to_string(), self.page_size.to_string()));

        if let Some(sort) = self.sort_key.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("sort".to_string(), sort.to_string()));
        }

        params
    }

    /// Number of pages for the server-reported total.
    pub fn page_count(&self, total_items: u64) -> u64 {
        page_count(total_items, self.page_size)
    }
}

fn is_active_filter(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != ALL
}

pub fn page_count(total_items: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total_items.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_all_filter_is_elided() {
        let mut query = QueryState::new(25).with_filter("status", "pending");
        assert_eq!(param(&query.to_params(), "status"), Some("pending"));

        query.set_filter("status", "all");
        assert_eq!(param(&query.to_params(), "status"), None);

        query.set_filter("status", "");
        assert_eq!(param(&query.to_params(), "status"), None);
    }

    #[test]
    fn test_pagination_is_one_based_on_the_wire() {
        let query = QueryState::new(25).with_page(1);
        let params = query.to_params();
        assert_eq!(param(&params, "page"), Some("2"));
        assert_eq!(param(&params, "limit"), Some("25"));
        assert_eq!(query.page_count(47), 2);
    }

    #[test]
    fn test_last_page_index_does_not_overflow() {
        let query = QueryState::new(25).with_page(u32::MAX);
        assert_eq!(param(&query.to_params(), "page"), Some("4294967296"));
    }

    #[test]
    fn test_page_count_edges() {
        assert_eq!(page_count(0, 25), 0);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
        assert_eq!(page_count(5, 0), 5);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut query = QueryState::new(10).with_page(3);
        query.set_filter("department", "engineering");
        assert_eq!(query.page, 0);
    }

    #[test]
    fn test_sort_is_optional() {
        let query = QueryState::new(10);
        assert_eq!(param(&query.to_params(), "sort"), None);
        let query = query.with_sort("-createdAt");
        assert_eq!(param(&query.to_params(), "sort"), Some("-createdAt"));
    }
}
