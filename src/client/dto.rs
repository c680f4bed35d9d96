use serde::{Deserialize, Serialize};

use crate::models::Pagination;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Query string for the paginated list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub status: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_by() -> String {
    DEFAULT_SORT_FIELD.to_string()
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            sort_by: default_sort_by(),
            sort_order: SortOrder::default(),
            search: None,
            status: None,
        }
    }
}

impl ListQuery {
    /// Search term with surrounding whitespace removed, if any remains.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn status_filter(&self) -> Option<&str> {
        self.status.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

/// Envelope for endpoints whose `data` is absent or irrelevant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_left_off_the_wire() {
        let query = ListQuery {
            search: Some("  ".to_string()),
            status: Some("active".to_string()),
            ..ListQuery::default()
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["page"], 1);
        assert_eq!(value["limit"], 10);
        assert_eq!(value["sortBy"], "createdAt");
        assert_eq!(value["sortOrder"], "desc");
        assert!(value.get("search").is_none());
        assert_eq!(value["status"], "active");
    }

    #[test]
    fn query_string_fills_defaults() {
        let query: ListQuery = serde_json::from_str(r#"{"search":"math"}"#).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert_eq!(query.search_term(), Some("math"));
        assert_eq!(query.status_filter(), None);
    }
}
