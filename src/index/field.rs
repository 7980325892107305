//! Field descriptors
//!
//! A descriptor is created once when a field is registered and never changes.
//! Its [`ValueCategory`] decides how raw values become store keys.

use serde::{Deserialize, Serialize};

use crate::table::FieldId;

/// Default separator between the values of a multi-valued text field.
pub const DEFAULT_DELIMITER: u8 = 0x01;

/// Scalar types known to the engine schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
    /// Single text value
    String,
    /// Delimiter-joined text values
    StringArray,
    /// One byte, 0 or 1
    Bool,
    /// 64-bit signed epoch value
    Date,
    /// Dense vector; never range-indexed
    Vector,
}

impl DataType {
    /// Returns the type name used in errors and logs
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Long => "LONG",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::String => "STRING",
            DataType::StringArray => "STRINGARRAY",
            DataType::Bool => "BOOL",
            DataType::Date => "DATE",
            DataType::Vector => "VECTOR",
        }
    }

    /// Maps the type to its key category, or `None` if it cannot be indexed.
    pub fn category(&self, delimiter: u8) -> Option<ValueCategory> {
        match self {
            DataType::Int => Some(ValueCategory::Integer { width: 4 }),
            DataType::Long | DataType::Date => Some(ValueCategory::Integer { width: 8 }),
            DataType::Bool => Some(ValueCategory::Integer { width: 1 }),
            DataType::Float => Some(ValueCategory::Float { width: 4 }),
            DataType::Double => Some(ValueCategory::Float { width: 8 }),
            DataType::String | DataType::StringArray => {
                Some(ValueCategory::Textual { delimiter })
            }
            DataType::Vector => None,
        }
    }
}

/// How a field's raw bytes are turned into ordered keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ValueCategory {
    /// Two's-complement signed integer of `width` bytes (1, 2, 4 or 8)
    Integer { width: usize },
    /// IEEE float of `width` bytes (4 or 8)
    Float { width: usize },
    /// Text split into tokens on `delimiter`
    Textual { delimiter: u8 },
}

impl ValueCategory {
    /// True for every fixed-width category.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueCategory::Textual { .. })
    }

    /// Byte width of numeric categories.
    pub fn width(&self) -> Option<usize> {
        match self {
            ValueCategory::Integer { width } | ValueCategory::Float { width } => Some(*width),
            ValueCategory::Textual { .. } => None,
        }
    }

    /// Token delimiter of textual categories.
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            ValueCategory::Textual { delimiter } => Some(*delimiter),
            _ => None,
        }
    }
}

/// Immutable metadata of one registered field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field_id: FieldId,
    pub data_type: DataType,
    pub category: ValueCategory,
    pub name: String,
}

impl FieldDescriptor {
    /// Builds a descriptor, or `None` for types that cannot be indexed.
    pub fn new(
        field_id: FieldId,
        data_type: DataType,
        name: impl Into<String>,
        delimiter: u8,
    ) -> Option<Self> {
        Some(Self {
            field_id,
            data_type,
            category: data_type.category(delimiter)?,
            name: name.into(),
        })
    }

    pub fn is_numeric(&self) -> bool {
        self.category.is_numeric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let cases = [
            (DataType::Int, Some(ValueCategory::Integer { width: 4 })),
            (DataType::Long, Some(ValueCategory::Integer { width: 8 })),
            (DataType::Date, Some(ValueCategory::Integer { width: 8 })),
            (DataType::Bool, Some(ValueCategory::Integer { width: 1 })),
            (DataType::Float, Some(ValueCategory::Float { width: 4 })),
            (DataType::Double, Some(ValueCategory::Float { width: 8 })),
            (DataType::String, Some(ValueCategory::Textual { delimiter: 1 })),
            (DataType::StringArray, Some(ValueCategory::Textual { delimiter: 1 })),
            (DataType::Vector, None),
        ];

        for (data_type, expected) in cases {
            assert_eq!(data_type.category(DEFAULT_DELIMITER), expected, "{:?}", data_type);
        }
    }

    #[test]
    fn test_vector_has_no_descriptor() {
        assert!(FieldDescriptor::new(0, DataType::Vector, "embedding", 1).is_none());
    }

    #[test]
    fn test_descriptor_is_numeric() {
        let price = FieldDescriptor::new(2, DataType::Double, "price", 1).unwrap();
        let tags = FieldDescriptor::new(3, DataType::StringArray, "tags", 1).unwrap();
        assert!(price.is_numeric());
        assert!(!tags.is_numeric());
        assert_eq!(tags.category.delimiter(), Some(1));
        assert_eq!(price.category.width(), Some(8));
    }

    #[test]
    fn test_data_type_serde_names() {
        let json = serde_json::to_string(&DataType::StringArray).unwrap();
        assert_eq!(json, "\"STRINGARRAY\"");
        let parsed: DataType = serde_json::from_str("\"LONG\"").unwrap();
        assert_eq!(parsed, DataType::Long);
    }
}
