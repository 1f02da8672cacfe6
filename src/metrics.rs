//! 解码指标收集模块
//!
//! 每个 `SchemaCache` 持有一份计数器，用于观察 schema 命中率、刷新次数和解码异常。

use crate::schema::SchemaCategory;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// 单个 schema 类别的统计
#[derive(Debug, Default)]
struct CategoryStats {
    /// 本地命中数
    hits: AtomicU64,
    /// 本地未命中数
    misses: AtomicU64,
    /// 完成的刷新次数
    refreshes: AtomicU64,
    /// 重试耗尽后返回占位名的次数
    exhausted: AtomicU64,
}

/// 解码指标
#[derive(Debug, Default)]
pub struct DecodeMetrics {
    labels: CategoryStats,
    relationship_types: CategoryStats,
    property_keys: CategoryStats,
    /// 单元格解码异常数
    decode_anomalies: AtomicU64,
    /// 已解码行数
    rows_decoded: AtomicU64,
}

/// 可导出的指标快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub schema_hits: u64,
    pub schema_misses: u64,
    pub schema_hit_rate: f64,
    pub label_refreshes: u64,
    pub relationship_type_refreshes: u64,
    pub property_key_refreshes: u64,
    pub resolve_exhausted: u64,
    pub decode_anomalies: u64,
    pub rows_decoded: u64,
}

impl DecodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn category(&self, category: SchemaCategory) -> &CategoryStats {
        match category {
            SchemaCategory::Label => &self.labels,
            SchemaCategory::RelationshipType => &self.relationship_types,
            SchemaCategory::PropertyKey => &self.property_keys,
        }
    }

    pub fn record_hit(&self, category: SchemaCategory) {
        self.category(category).hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, category: SchemaCategory) {
        self.category(category).misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self, category: SchemaCategory) {
        self.category(category)
            .refreshes
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self, category: SchemaCategory) {
        self.category(category)
            .exhausted
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_anomaly(&self) {
        self.decode_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rows(&self, rows: usize) {
        self.rows_decoded.fetch_add(rows as u64, Ordering::Relaxed);
    }

    /// 某类别已完成的刷新次数
    pub fn refreshes(&self, category: SchemaCategory) -> u64 {
        self.category(category).refreshes.load(Ordering::Relaxed)
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        let all = [&self.labels, &self.relationship_types, &self.property_keys];
        let hits: u64 = all.iter().map(|c| c.hits.load(Ordering::Relaxed)).sum();
        let misses: u64 = all.iter().map(|c| c.misses.load(Ordering::Relaxed)).sum();
        let exhausted: u64 = all.iter().map(|c| c.exhausted.load(Ordering::Relaxed)).sum();

        let hit_rate = if hits + misses > 0 {
            (hits as f64) / ((hits + misses) as f64)
        } else {
            0.0
        };

        MetricsSnapshot {
            schema_hits: hits,
            schema_misses: misses,
            schema_hit_rate: hit_rate,
            label_refreshes: self.refreshes(SchemaCategory::Label),
            relationship_type_refreshes: self.refreshes(SchemaCategory::RelationshipType),
            property_key_refreshes: self.refreshes(SchemaCategory::PropertyKey),
            resolve_exhausted: exhausted,
            decode_anomalies: self.decode_anomalies.load(Ordering::Relaxed),
            rows_decoded: self.rows_decoded.load(Ordering::Relaxed),
        }
    }

    /// 导出为 Prometheus 格式
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut content = String::new();

        let mut metric = |name: &str, kind: &str, help: &str, value: String| {
            content.push_str(&format!("# HELP graphreply_{} {}\n", name, help));
            content.push_str(&format!("# TYPE graphreply_{} {}\n", name, kind));
            content.push_str(&format!("graphreply_{} {}\n", name, value));
        };

        metric("schema_hits_total", "counter", "Schema id lookups served locally", snapshot.schema_hits.to_string());
        metric("schema_misses_total", "counter", "Schema id lookups that missed", snapshot.schema_misses.to_string());
        metric("schema_hit_rate", "gauge", "Schema lookup hit rate (0-1)", format!("{:.4}", snapshot.schema_hit_rate));
        metric("label_refreshes_total", "counter", "Label list refreshes", snapshot.label_refreshes.to_string());
        metric(
            "relationship_type_refreshes_total",
            "counter",
            "Relationship type list refreshes",
            snapshot.relationship_type_refreshes.to_string(),
        );
        metric("property_key_refreshes_total", "counter", "Property key list refreshes", snapshot.property_key_refreshes.to_string());
        metric("resolve_exhausted_total", "counter", "Schema ids left unresolved after retries", snapshot.resolve_exhausted.to_string());
        metric("decode_anomalies_total", "counter", "Cells decoded as placeholders", snapshot.decode_anomalies.to_string());
        metric("rows_decoded_total", "counter", "Rows decoded", snapshot.rows_decoded.to_string());

        content
    }

    /// 重置所有指标
    pub fn reset(&self) {
        for c in [&self.labels, &self.relationship_types, &self.property_keys] {
            c.hits.store(0, Ordering::Relaxed);
            c.misses.store(0, Ordering::Relaxed);
            c.refreshes.store(0, Ordering::Relaxed);
            c.exhausted.store(0, Ordering::Relaxed);
        }
        self.decode_anomalies.store(0, Ordering::Relaxed);
        self.rows_decoded.store(0, Ordering::Relaxed);
    }
}
