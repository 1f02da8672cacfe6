//! 结果记录

use crate::types::Value;
use std::sync::Arc;

/// 记录的访问键：列名或列下标
pub trait RecordKey {
    fn position(&self, header: &[String]) -> Option<usize>;
}

impl RecordKey for usize {
    fn position(&self, header: &[String]) -> Option<usize> {
        (*self < header.len()).then_some(*self)
    }
}

impl RecordKey for &str {
    /// 同名列取第一个
    fn position(&self, header: &[String]) -> Option<usize> {
        header.iter().position(|h| h == self)
    }
}

impl RecordKey for &String {
    fn position(&self, header: &[String]) -> Option<usize> {
        self.as_str().position(header)
    }
}

/// 与表头对齐的一行结果，构造后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    header: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// 创建记录
    ///
    /// # Panics
    ///
    /// 表头与值的数量不一致时 panic。
    pub fn new(header: impl Into<Arc<[String]>>, values: Vec<Value>) -> Self {
        let header = header.into();
        assert_eq!(
            header.len(),
            values.len(),
            "record header has {} columns but {} values were given",
            header.len(),
            values.len()
        );
        Self { header, values }
    }

    pub fn get<K: RecordKey>(&self, key: K) -> Option<&Value> {
        key.position(&self.header).map(|i| &self.values[i])
    }

    /// 值的字符串形式；Null 与不存在都返回 `None`
    pub fn get_string<K: RecordKey>(&self, key: K) -> Option<String> {
        match self.get(key)? {
            Value::Null => None,
            value => Some(value.to_string()),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.header
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.header.iter().any(|h| h == key)
    }

    pub fn size(&self) -> usize {
        self.header.len()
    }

    /// 按列迭代 (列名, 值)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.header.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
