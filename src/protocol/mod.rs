//! 紧凑协议模块
//!
//! 服务端以嵌套数组的形式返回查询结果：
//! - 原始响应 (RawReply)
//! - 值类型标签 (ValueType) 与列类型标签 (ColumnType)
//! - 标量编解码 (codec)

pub mod codec;
mod reply;

pub use reply::RawReply;

use serde::{Deserialize, Serialize};
use std::fmt;

/// 值类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Unknown,
    Null,
    String,
    Integer,
    Boolean,
    Double,
    Array,
    Edge,
    Node,
    Path,
    Map,
}

impl ValueType {
    /// 从线上整数标签转换，未知标签映射为 `Unknown`
    pub fn from_tag(tag: i64) -> Self {
        match tag {
            1 => ValueType::Null,
            2 => ValueType::String,
            3 => ValueType::Integer,
            4 => ValueType::Boolean,
            5 => ValueType::Double,
            6 => ValueType::Array,
            7 => ValueType::Edge,
            8 => ValueType::Node,
            9 => ValueType::Path,
            10 => ValueType::Map,
            _ => ValueType::Unknown,
        }
    }

    pub fn tag(&self) -> i64 {
        match self {
            ValueType::Unknown => 0,
            ValueType::Null => 1,
            ValueType::String => 2,
            ValueType::Integer => 3,
            ValueType::Boolean => 4,
            ValueType::Double => 5,
            ValueType::Array => 6,
            ValueType::Edge => 7,
            ValueType::Node => 8,
            ValueType::Path => 9,
            ValueType::Map => 10,
        }
    }

    /// 是否需要异步解码（可能引用 schema id）
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ValueType::Array | ValueType::Map | ValueType::Node | ValueType::Edge | ValueType::Path
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 列类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Unknown,
    Scalar,
    Node,
    Relation,
}

impl ColumnType {
    pub fn from_tag(tag: i64) -> Self {
        match tag {
            1 => ColumnType::Scalar,
            2 => ColumnType::Node,
            3 => ColumnType::Relation,
            _ => ColumnType::Unknown,
        }
    }

    pub fn tag(&self) -> i64 {
        match self {
            ColumnType::Unknown => 0,
            ColumnType::Scalar => 1,
            ColumnType::Node => 2,
            ColumnType::Relation => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_tags() {
        for tag in 0..=10 {
            assert_eq!(ValueType::from_tag(tag).tag(), tag);
        }
        assert_eq!(ValueType::from_tag(42), ValueType::Unknown);
        assert_eq!(ValueType::from_tag(-1), ValueType::Unknown);
        assert!(ValueType::Path.is_composite());
        assert!(!ValueType::Double.is_composite());
    }

    #[test]
    fn test_column_tags() {
        assert_eq!(ColumnType::from_tag(1), ColumnType::Scalar);
        assert_eq!(ColumnType::from_tag(2), ColumnType::Node);
        assert_eq!(ColumnType::from_tag(3), ColumnType::Relation);
        assert_eq!(ColumnType::from_tag(9), ColumnType::Unknown);
        assert_eq!(ColumnType::Relation.tag(), 3);
    }
}
