//! Filter predicates
//!
//! A filter names one field and a pair of raw boundary values. Numeric fields
//! are scanned over `[lower, upper]` after exclusive bounds are tightened;
//! textual fields use `lower_value` as a delimiter-joined token list and
//! ignore `upper_value`.

use serde::{Deserialize, Serialize};

use crate::table::FieldId;

/// How a filter's matches contribute to the search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Textual token lists are split into one filter per token
    And,
    /// Matches join the included set
    #[default]
    Or,
    /// Matches join the excluded set
    Not,
}

/// One range or term predicate on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInfo {
    pub field: FieldId,
    pub lower_value: Vec<u8>,
    pub upper_value: Vec<u8>,
    pub include_lower: bool,
    pub include_upper: bool,
    pub operator: FilterOperator,
}

impl FilterInfo {
    /// Inclusive range over raw little-endian bounds.
    pub fn range(field: FieldId, lower: Vec<u8>, upper: Vec<u8>) -> Self {
        Self {
            field,
            lower_value: lower,
            upper_value: upper,
            include_lower: true,
            include_upper: true,
            operator: FilterOperator::Or,
        }
    }

    pub fn range_i32(field: FieldId, lower: i32, upper: i32) -> Self {
        Self::range(field, lower.to_le_bytes().to_vec(), upper.to_le_bytes().to_vec())
    }

    pub fn range_i64(field: FieldId, lower: i64, upper: i64) -> Self {
        Self::range(field, lower.to_le_bytes().to_vec(), upper.to_le_bytes().to_vec())
    }

    pub fn range_f32(field: FieldId, lower: f32, upper: f32) -> Self {
        Self::range(field, lower.to_le_bytes().to_vec(), upper.to_le_bytes().to_vec())
    }

    pub fn range_f64(field: FieldId, lower: f64, upper: f64) -> Self {
        Self::range(field, lower.to_le_bytes().to_vec(), upper.to_le_bytes().to_vec())
    }

    /// Equality on a single integer value.
    pub fn eq_i64(field: FieldId, value: i64) -> Self {
        Self::range_i64(field, value, value)
    }

    /// Token membership on a textual field: matches documents holding any of
    /// `terms` (or, with [`FilterOperator::And`], one filter per term).
    pub fn terms(field: FieldId, terms: &[&str], delimiter: u8) -> Self {
        let joined = terms
            .iter()
            .map(|t| t.as_bytes())
            .collect::<Vec<_>>()
            .join(&delimiter);
        Self {
            field,
            lower_value: joined,
            upper_value: Vec::new(),
            include_lower: true,
            include_upper: true,
            operator: FilterOperator::Or,
        }
    }

    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn exclude_lower(mut self) -> Self {
        self.include_lower = false;
        self
    }

    pub fn exclude_upper(mut self) -> Self {
        self.include_upper = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let f = FilterInfo::range_i32(7, 20, 30)
            .exclude_upper()
            .with_operator(FilterOperator::Not);
        assert_eq!(f.lower_value, 20i32.to_le_bytes().to_vec());
        assert!(f.include_lower);
        assert!(!f.include_upper);
        assert_eq!(f.operator, FilterOperator::Not);
    }

    #[test]
    fn test_terms_joined_by_delimiter() {
        let f = FilterInfo::terms(1, &["red", "blue"], 0x01);
        assert_eq!(f.lower_value, b"red\x01blue".to_vec());
        assert_eq!(f.operator, FilterOperator::Or);
    }

    #[test]
    fn test_filter_from_json() {
        let f: FilterInfo = serde_json::from_str(
            r#"{"field":3,"lower_value":[10,0,0,0],"upper_value":[20,0,0,0],
                "include_lower":true,"include_upper":false,"operator":"Not"}"#,
        )
        .unwrap();
        assert_eq!(f.field, 3);
        assert_eq!(f.operator, FilterOperator::Not);
        assert!(!f.include_upper);
    }
}
