//! 查询结果模块
//!
//! 将一次查询的原始响应解析为表头、记录和统计信息。

mod decoder;
mod record;
mod result_set;
mod statistics;

pub use decoder::ReplyDecoder;
pub use record::{Record, RecordKey};
pub use result_set::{ResultSet, ResultSetState};
pub use statistics::{StatLabel, Statistics};
