//! 边定义

use crate::graph::node::NodeId;
use crate::types::{Properties, Value};
use serde::Serialize;
use std::fmt;

/// 边 ID（由服务端分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 边
///
/// 源和目标节点只以 ID 引用，不保证同一结果中存在对应的 `Node`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// 边 ID
    id: EdgeId,
    /// 关系类型
    relation_type: String,
    /// 源节点 ID
    source: NodeId,
    /// 目标节点 ID
    destination: NodeId,
    /// 属性
    properties: Properties,
}

impl Edge {
    /// 创建新边
    pub fn new(
        id: impl Into<EdgeId>,
        relation_type: impl Into<String>,
        source: impl Into<NodeId>,
        destination: impl Into<NodeId>,
        properties: Properties,
    ) -> Self {
        Self {
            id: id.into(),
            relation_type: relation_type.into(),
            source: source.into(),
            destination: destination.into(),
            properties,
        }
    }

    /// 获取边 ID
    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn relation_type(&self) -> &str {
        &self.relation_type
    }

    pub fn source_node_id(&self) -> NodeId {
        self.source
    }

    pub fn dest_node_id(&self) -> NodeId {
        self.destination
    }

    /// 是否连接两个节点（不区分方向）
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.destination == b) || (self.source == b && self.destination == a)
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

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "Edge({})", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_accessors() {
        let mut props = Properties::new();
        props.insert("since".to_string(), Value::Integer(2019));
        let edge = Edge::new(3, "knows", 0, 1, props);

        assert_eq!(edge.id().as_u64(), 3);
        assert_eq!(edge.relation_type(), "knows");
        assert_eq!(edge.source_node_id(), NodeId(0));
        assert_eq!(edge.dest_node_id(), NodeId(1));
        assert!(edge.connects(NodeId(1), NodeId(0)));
        assert!(!edge.connects(NodeId(1), NodeId(2)));
        assert_eq!(edge.property("since"), Some(&Value::Integer(2019)));
    }
}
