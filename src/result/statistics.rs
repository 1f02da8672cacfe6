//! 查询统计信息
//!
//! 响应末尾是若干 `"<Label>: <value>"` 形式的字符串，首次访问时解析并缓存。

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 统计项标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatLabel {
    LabelsAdded,
    NodesCreated,
    NodesDeleted,
    RelationshipsDeleted,
    PropertiesSet,
    RelationshipsCreated,
    IndicesCreated,
    IndicesDeleted,
    CachedExecution,
    QueryInternalExecutionTime,
}

impl StatLabel {
    pub const ALL: [StatLabel; 10] = [
        StatLabel::LabelsAdded,
        StatLabel::NodesCreated,
        StatLabel::NodesDeleted,
        StatLabel::RelationshipsDeleted,
        StatLabel::PropertiesSet,
        StatLabel::RelationshipsCreated,
        StatLabel::IndicesCreated,
        StatLabel::IndicesDeleted,
        StatLabel::CachedExecution,
        StatLabel::QueryInternalExecutionTime,
    ];

    /// 线上使用的标签文本
    pub fn as_str(&self) -> &'static str {
        match self {
            StatLabel::LabelsAdded => "Labels added",
            StatLabel::NodesCreated => "Nodes created",
            StatLabel::NodesDeleted => "Nodes deleted",
            StatLabel::RelationshipsDeleted => "Relationships deleted",
            StatLabel::PropertiesSet => "Properties set",
            StatLabel::RelationshipsCreated => "Relationships created",
            StatLabel::IndicesCreated => "Indices created",
            StatLabel::IndicesDeleted => "Indices deleted",
            StatLabel::CachedExecution => "Cached execution",
            StatLabel::QueryInternalExecutionTime => "Query internal execution time",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == label)
    }
}

impl fmt::Display for StatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 查询统计
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    raw: Vec<String>,
    parsed: OnceCell<IndexMap<String, String>>,
}

impl Statistics {
    pub fn new(raw: Vec<String>) -> Self {
        Self {
            raw,
            parsed: OnceCell::new(),
        }
    }

    /// 原始统计行
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    fn parsed(&self) -> &IndexMap<String, String> {
        self.parsed.get_or_init(|| {
            self.raw
                .iter()
                .filter_map(|line| line.split_once(':'))
                .map(|(label, value)| (label.trim().to_string(), value.trim().to_string()))
                .collect()
        })
    }

    /// 按标签文本取原始值（已去除首尾空白）
    pub fn get_string_value(&self, label: &str) -> Option<&str> {
        self.parsed().get(label).map(String::as_str)
    }

    /// 整数值，缺失或无法解析时为 0
    pub fn get_int_value(&self, label: &str) -> i64 {
        self.get_string_value(label).map(leading_int).unwrap_or(0)
    }

    /// 浮点值，缺失或无法解析时为 0
    pub fn get_float_value(&self, label: &str) -> f64 {
        self.get_string_value(label).map(leading_float).unwrap_or(0.0)
    }

    pub fn value(&self, label: StatLabel) -> Option<&str> {
        self.get_string_value(label.as_str())
    }

    pub fn labels_added(&self) -> i64 {
        self.get_int_value(StatLabel::LabelsAdded.as_str())
    }

    pub fn nodes_created(&self) -> i64 {
        self.get_int_value(StatLabel::NodesCreated.as_str())
    }

    pub fn nodes_deleted(&self) -> i64 {
        self.get_int_value(StatLabel::NodesDeleted.as_str())
    }

    pub fn relationships_created(&self) -> i64 {
        self.get_int_value(StatLabel::RelationshipsCreated.as_str())
    }

    pub fn relationships_deleted(&self) -> i64 {
        self.get_int_value(StatLabel::RelationshipsDeleted.as_str())
    }

    pub fn properties_set(&self) -> i64 {
        self.get_int_value(StatLabel::PropertiesSet.as_str())
    }

    pub fn indices_created(&self) -> i64 {
        self.get_int_value(StatLabel::IndicesCreated.as_str())
    }

    pub fn indices_deleted(&self) -> i64 {
        self.get_int_value(StatLabel::IndicesDeleted.as_str())
    }

    /// 服务端是否复用了缓存的执行计划
    pub fn cached_execution(&self) -> bool {
        self.get_int_value(StatLabel::CachedExecution.as_str()) == 1
    }

    /// 服务端内部执行耗时（毫秒）
    pub fn query_execution_time(&self) -> f64 {
        self.get_float_value(StatLabel::QueryInternalExecutionTime.as_str())
    }

    /// 按原始顺序迭代全部统计项
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parsed()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.parsed().is_empty()
    }
}

/// 读取开头的整数部分，例如 `"12 ms"` → 12
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}

/// 读取开头最长的合法浮点数，例如 `"0.228 ms"` → 0.228
fn leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    (1..=end)
        .rev()
        .find_map(|len| s[..len].parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(lines: &[&str]) -> Statistics {
        Statistics::new(lines.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_typed_accessors() {
        let s = stats(&[
            "Labels added: 1",
            "Nodes created: 2",
            "Properties set: 3",
            "Relationships created: 1",
            "Cached execution: 1",
            "Query internal execution time: 0.228 ms",
        ]);

        assert_eq!(s.labels_added(), 1);
        assert_eq!(s.nodes_created(), 2);
        assert_eq!(s.properties_set(), 3);
        assert_eq!(s.relationships_created(), 1);
        assert!(s.cached_execution());
        assert!((s.query_execution_time() - 0.228).abs() < 1e-9);
        assert_eq!(
            s.get_string_value("Query internal execution time"),
            Some("0.228 ms")
        );
    }

    #[test]
    fn test_absent_labels_are_zero() {
        let s = stats(&["Nodes created: 1"]);
        for label in StatLabel::ALL {
            if label != StatLabel::NodesCreated {
                assert_eq!(s.get_int_value(label.as_str()), 0, "{}", label);
                assert_eq!(s.get_float_value(label.as_str()), 0.0);
                assert_eq!(s.value(label), None);
            }
        }
        assert!(!s.cached_execution());
        assert_eq!(s.get_int_value("no such label"), 0);
    }

    #[test]
    fn test_malformed_lines() {
        let s = stats(&["garbage", "Nodes deleted: many", "Indices created:  4  "]);
        assert_eq!(s.nodes_deleted(), 0);
        assert_eq!(s.indices_created(), 4);
        assert_eq!(s.iter().count(), 2);
    }

    #[test]
    fn test_leading_numbers() {
        assert_eq!(leading_int("12 ms"), 12);
        assert_eq!(leading_int("-3"), -3);
        assert_eq!(leading_int("0.228 ms"), 0);
        assert_eq!(leading_float("1e3x"), 1000.0);
        assert_eq!(leading_float("5."), 5.0);
        assert_eq!(leading_float("ms"), 0.0);
    }

    #[test]
    fn test_label_round_trip() {
        for label in StatLabel::ALL {
            assert_eq!(StatLabel::from_label(label.as_str()), Some(label));
        }
        assert_eq!(StatLabel::from_label("Nodes"), None);
    }
}
