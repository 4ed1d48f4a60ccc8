//! Container record types
//!
//! Every mutation of a container is one record:
//! - CreateGroup: add a named group
//! - CreateArray: add a resizable one-dimensional typed array
//! - SetAttr: set (or replace) an attribute on a group or array
//! - SetAttrs: set several attributes of one node in a single record
//! - Extend: append one chunk of elements to an array
//!
//! Paths are `/`-separated and relative to the root group; the empty path
//! names the root.

use datachest_core::{DType, Value};
use serde::{Deserialize, Serialize};

use crate::array::ArrayData;
use crate::error::StorageResult;

/// One container mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// Add a group
    CreateGroup {
        /// Path of the new group
        path: String,
    },

    /// Add a resizable typed array
    CreateArray {
        /// Path of the new array
        path: String,
        /// Element dtype
        dtype: DType,
        /// Elements per logical chunk (the flattened cell size)
        chunk_len: u64,
    },

    /// Set an attribute
    SetAttr {
        /// Group or array the attribute belongs to
        path: String,
        /// Attribute name
        name: String,
        /// Attribute value
        value: Value,
    },

    /// Set several attributes of one node at once
    SetAttrs {
        /// Group or array the attributes belong to
        path: String,
        /// Attribute names and values, applied in order
        attrs: Vec<(String, Value)>,
    },

    /// Append elements to an array
    Extend {
        /// Array path
        path: String,
        /// Array length before this chunk; must match on replay
        offset: u64,
        /// Elements to append
        data: ArrayData,
    },
}

impl Record {
    /// Path the record applies to
    pub fn path(&self) -> &str {
        match self {
            Record::CreateGroup { path }
            | Record::CreateArray { path, .. }
            | Record::SetAttr { path, .. }
            | Record::SetAttrs { path, .. }
            | Record::Extend { path, .. } => path,
        }
    }

    /// Short record kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Record::CreateGroup { .. } => "create_group",
            Record::CreateArray { .. } => "create_array",
            Record::SetAttr { .. } => "set_attr",
            Record::SetAttrs { .. } => "set_attrs",
            Record::Extend { .. } => "extend",
        }
    }

    /// Serialize to a frame payload
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from a frame payload
    pub fn decode(bytes: &[u8]) -> StorageResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_records_serialize() {
        let records = vec![
            Record::CreateGroup {
                path: "independents".into(),
            },
            Record::CreateArray {
                path: "independents/t".into(),
                dtype: DType::Float64,
                chunk_len: 1,
            },
            Record::SetAttr {
                path: "".into(),
                name: "Data Category".into(),
                value: Value::from("1D Scan"),
            },
            Record::SetAttrs {
                path: "".into(),
                attrs: vec![
                    ("Number Of Rows Added".into(), Value::UInt64(3)),
                    ("Date Modified".into(), Value::from("2026-10-16T10:00:00")),
                ],
            },
            Record::Extend {
                path: "dependents/v".into(),
                offset: 4,
                data: ArrayData::Complex128(vec![datachest_core::Complex64::new(1.0, -1.0)]),
            },
        ];

        for record in records {
            let encoded = record.encode().expect("serialization failed");
            let decoded = Record::decode(&encoded).expect("deserialization failed");
            assert_eq!(record, decoded);
        }
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(Record::decode(&[0xff, 0xff, 0xff, 0xff, 0x01]).is_err());
    }
}
