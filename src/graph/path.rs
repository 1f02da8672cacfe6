//! 路径定义
//!
//! `edges[i]` 连接 `nodes[i]` 与 `nodes[i + 1]`（按遍历顺序），边自身的方向可能与遍历方向相反，
//! 解码时不做校验，只保留顺序。

use crate::graph::{Edge, Node};
use serde::Serialize;
use std::fmt;

/// 路径
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Path {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    pub fn first_node(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_node(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// 节点数 N ≥ 1 且边数为 N - 1
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty() && self.edges.len() + 1 == self.nodes.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "Path({} nodes)", self.nodes.len()),
        }
    }
}
