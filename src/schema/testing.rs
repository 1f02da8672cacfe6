//! 测试用 schema 来源

use super::{BoxFuture, SchemaCategory, SchemaSource, StaticSchema};
use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 记录调用次数，名称取自内部的 `StaticSchema`
pub(crate) struct CountingSource {
    inner: StaticSchema,
    calls: AtomicUsize,
}

impl CountingSource {
    pub(crate) fn new(inner: StaticSchema) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SchemaSource for CountingSource {
    fn fetch_names(&self, category: SchemaCategory) -> BoxFuture<'_, Result<Vec<String>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_names(category)
    }
}
