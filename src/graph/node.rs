//! 节点定义

use crate::types::{Properties, Value};
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

/// 节点 ID（由服务端分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// 节点 ID
    id: NodeId,
    /// 标签列表（可能为空）
    labels: SmallVec<[String; 1]>,
    /// 属性，顺序与线上一致
    properties: Properties,
}

impl Node {
    /// 创建新节点
    pub fn new<I, S>(id: impl Into<NodeId>, labels: I, properties: Properties) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            properties,
        }
    }

    /// 获取节点 ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// 获取全部标签
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// 第一个标签（旧协议中节点只有一个标签）
    pub fn label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// 获取属性
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// 获取所有属性
    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "Node({})", self.id),
        }
    }
}
