//! 图实体模块
//!
//! 解码后的节点、边和路径

mod edge;
mod node;
mod path;

pub use edge::{Edge, EdgeId};
pub use node::{Node, NodeId};
pub use path::Path;
