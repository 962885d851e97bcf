//! Page parsing
//!
//! A page is `{"total": <int>, "data": [<record>, ...]}`. Records stay opaque.

use harvest_common::Record;
use serde_json::Value;
use thiserror::Error;

/// Structural problems with a page body
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageShapeError {
    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("response has no 'data' field")]
    MissingData,

    #[error("'data' is not an array")]
    DataNotArray,

    #[error("response has no usable 'total' field")]
    MissingTotal,
}

/// One window of records from a paginated endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub data: Vec<Record>,

    /// Declared total; only meaningful on the first page
    pub total: Option<u64>,
}

impl Page {
    /// Parse a decoded body. With `require_total`, a missing or negative total is
    /// a structural error.
    pub fn from_value(value: Value, require_total: bool) -> Result<Self, PageShapeError> {
        let Value::Object(mut body) = value else {
            return Err(PageShapeError::NotAnObject);
        };

        let total = body.get("total").and_then(Value::as_u64);
        if require_total && total.is_none() {
            return Err(PageShapeError::MissingTotal);
        }

        let data = match body.remove("data") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(PageShapeError::DataNotArray),
            None => return Err(PageShapeError::MissingData),
        };

        Ok(Self { data, total })
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page() {
        let page = Page::from_value(json!({"total": 2, "data": [{"_id": 1}, {"_id": 2}]}), true).unwrap();
        assert_eq!(page.total, Some(2));
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[1]["_id"], json!(2));
    }

    #[test]
    fn test_total_optional_after_first_page() {
        let page = Page::from_value(json!({"data": []}), false).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(
            Page::from_value(json!([1, 2]), false).unwrap_err(),
            PageShapeError::NotAnObject
        );
        assert_eq!(
            Page::from_value(json!({"total": 3}), true).unwrap_err(),
            PageShapeError::MissingData
        );
        assert_eq!(
            Page::from_value(json!({"total": 3, "data": {}}), true).unwrap_err(),
            PageShapeError::DataNotArray
        );
        assert_eq!(
            Page::from_value(json!({"total": -1, "data": []}), true).unwrap_err(),
            PageShapeError::MissingTotal
        );
    }
}
