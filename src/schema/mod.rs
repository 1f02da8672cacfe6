//! Schema 缓存模块
//!
//! 服务端在结果中只返回标签、关系类型和属性键的整数 ID，名称需要通过
//! `db.labels()` 等过程查询。`SchemaCache` 在本地缓存三类 ID → 名称映射：
//! - 同步查找 (`lookup`)，不阻塞
//! - 异步解析 (`resolve`)，未命中时整体刷新对应类别，并带有限次重试
//! - 同一类别同一时刻最多只有一次刷新在进行 (single-flight)

mod source;
#[cfg(test)]
pub(crate) mod testing;

pub use source::{SchemaSource, StaticSchema};

use crate::error::Result;
use crate::metrics::DecodeMetrics;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// 默认最大解析尝试次数
pub const DEFAULT_MAX_RESOLVE_ATTEMPTS: usize = 10;

/// 最小尝试次数：首次刷新之后至少还有一次重试
pub const MIN_RESOLVE_ATTEMPTS: usize = 2;

/// 可跨线程传递的装箱 future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Schema 类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaCategory {
    Label,
    RelationshipType,
    PropertyKey,
}

impl SchemaCategory {
    pub const ALL: [SchemaCategory; 3] = [
        SchemaCategory::Label,
        SchemaCategory::RelationshipType,
        SchemaCategory::PropertyKey,
    ];

    /// 列出该类别全部名称的过程
    pub fn procedure(&self) -> &'static str {
        match self {
            SchemaCategory::Label => "db.labels",
            SchemaCategory::RelationshipType => "db.relationshipTypes",
            SchemaCategory::PropertyKey => "db.propertyKeys",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaCategory::Label => "label",
            SchemaCategory::RelationshipType => "relationship type",
            SchemaCategory::PropertyKey => "property key",
        }
    }

    /// 重试耗尽后使用的占位名
    pub fn placeholder(&self, id: u64) -> String {
        format!("<unknown {} #{}>", self.as_str(), id)
    }
}

impl fmt::Display for SchemaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单个类别的缓存槽
#[derive(Default)]
struct Slot {
    /// 下标即 ID
    names: RwLock<Vec<String>>,
    /// 每次整体替换后递增
    generation: AtomicU64,
    /// 刷新闸门，持有者负责唯一一次刷新
    gate: tokio::sync::Mutex<()>,
}

impl Slot {
    fn replace(&self, names: Vec<String>) {
        *self.names.write() = names;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Schema 缓存，由图句柄持有并在所有查询间共享
pub struct SchemaCache {
    source: Arc<dyn SchemaSource>,
    labels: Slot,
    relationship_types: Slot,
    property_keys: Slot,
    max_attempts: usize,
    metrics: DecodeMetrics,
}

impl SchemaCache {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self::with_max_attempts(source, DEFAULT_MAX_RESOLVE_ATTEMPTS)
    }

    /// 指定最大解析尝试次数，小于 `MIN_RESOLVE_ATTEMPTS` 时取该值
    pub fn with_max_attempts(source: Arc<dyn SchemaSource>, max_attempts: usize) -> Self {
        Self {
            source,
            labels: Slot::default(),
            relationship_types: Slot::default(),
            property_keys: Slot::default(),
            max_attempts: max_attempts.max(MIN_RESOLVE_ATTEMPTS),
            metrics: DecodeMetrics::new(),
        }
    }

    fn slot(&self, category: SchemaCategory) -> &Slot {
        match category {
            SchemaCategory::Label => &self.labels,
            SchemaCategory::RelationshipType => &self.relationship_types,
            SchemaCategory::PropertyKey => &self.property_keys,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn metrics(&self) -> &DecodeMetrics {
        &self.metrics
    }

    /// 同步查找，不触发刷新
    pub fn lookup(&self, category: SchemaCategory, id: u64) -> Option<String> {
        let names = self.slot(category).names.read();
        usize::try_from(id).ok().and_then(|i| names.get(i).cloned())
    }

    /// 当前缓存的全部名称
    pub fn names(&self, category: SchemaCategory) -> Vec<String> {
        self.slot(category).names.read().clone()
    }

    /// 预先填充某个类别
    pub fn preload(&self, category: SchemaCategory, names: Vec<String>) {
        self.slot(category).replace(names);
    }

    /// 清空全部类别（例如图被删除后）
    pub fn clear(&self) {
        for category in SchemaCategory::ALL {
            self.slot(category).replace(Vec::new());
        }
    }

    /// 先查本地，未命中再异步解析
    pub async fn name_of(&self, category: SchemaCategory, id: u64) -> Result<String> {
        if let Some(name) = self.lookup(category, id) {
            self.metrics.record_hit(category);
            return Ok(name);
        }
        self.metrics.record_miss(category);
        self.resolve(category, id).await
    }

    /// 异步解析 ID
    ///
    /// 每轮先检查本地，未命中则参与一次（可能被合并的）刷新后再检查。
    /// 超过最大尝试次数仍未找到时返回占位名，不视为错误。
    /// 刷新过程中的传输错误原样返回。
    pub async fn resolve(&self, category: SchemaCategory, id: u64) -> Result<String> {
        let slot = self.slot(category);

        for attempt in 1..=self.max_attempts {
            // 必须先读取代数再查找，否则可能错过一次刚完成的刷新
            let seen = slot.generation.load(Ordering::Acquire);
            if let Some(name) = self.lookup(category, id) {
                return Ok(name);
            }
            debug!(%category, id, attempt, "schema id 未命中，等待刷新");
            self.refresh_after(category, seen).await?;
        }

        if let Some(name) = self.lookup(category, id) {
            return Ok(name);
        }

        warn!(
            %category,
            id,
            attempts = self.max_attempts,
            "无法解析 schema id，使用占位名"
        );
        self.metrics.record_exhausted(category);
        Ok(category.placeholder(id))
    }

    /// 强制刷新某个类别并返回最新名称；与正在进行的刷新合并
    pub async fn refresh(&self, category: SchemaCategory) -> Result<Vec<String>> {
        let seen = self.slot(category).generation.load(Ordering::Acquire);
        self.refresh_after(category, seen).await?;
        Ok(self.names(category))
    }

    /// 如果自 `seen` 以来没有其他调用方完成刷新，则执行一次刷新
    async fn refresh_after(&self, category: SchemaCategory, seen: u64) -> Result<()> {
        let slot = self.slot(category);
        let _guard = slot.gate.lock().await;

        if slot.generation.load(Ordering::Acquire) != seen {
            debug!(%category, "复用已完成的刷新");
            return Ok(());
        }

        let names = self.source.fetch_names(category).await?;
        debug!(%category, count = names.len(), "schema 已刷新");
        slot.replace(names);
        self.metrics.record_refresh(category);
        Ok(())
    }
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache")
            .field("labels", &self.labels.names.read().len())
            .field("relationship_types", &self.relationship_types.names.read().len())
            .field("property_keys", &self.property_keys.names.read().len())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}
