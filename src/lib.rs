//! GraphReply - 图查询客户端的响应解码与 schema 解析核心
//!
//! 服务端以紧凑格式返回查询结果：值带有整数类型标签，节点和边中的标签、
//! 关系类型、属性键都只以 schema ID 出现。本库负责：
//! - 按类型标签解码标量、数组、映射和图实体
//! - 在本地缓存 schema ID → 名称映射，未命中时合并刷新并有限次重试
//! - 解析表头、记录和统计信息

pub mod cli;
pub mod client;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod protocol;
pub mod result;
pub mod schema;
pub mod types;

// 重导出常用类型
pub use client::{Graph, GraphConfig, Transport};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeId, Node, NodeId, Path};
pub use metrics::{DecodeMetrics, MetricsSnapshot};
pub use protocol::{ColumnType, RawReply, ValueType};
pub use result::{Record, ResultSet, ResultSetState, StatLabel, Statistics};
pub use schema::{SchemaCache, SchemaCategory, SchemaSource, StaticSchema};
pub use types::{Properties, Value};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
