//! 原始响应
//!
//! 传输层返回的未解码数据，结构与 RESP 回复一一对应。

use crate::error::{Error, Result};
use serde::Serialize;

/// 传输层返回的原始回复
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RawReply {
    Nil,
    Integer(i64),
    Double(f64),
    Bulk(String),
    Status(String),
    Error(String),
    Array(Vec<RawReply>),
}

impl RawReply {
    pub fn as_array(&self) -> Option<&[RawReply]> {
        match self {
            RawReply::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawReply::Bulk(s) | RawReply::Status(s) => Some(s),
            _ => None,
        }
    }

    /// 整数回复，或可解析为整数的字符串回复
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawReply::Integer(v) => Some(*v),
            RawReply::Bulk(s) | RawReply::Status(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|v| u64::try_from(v).ok())
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RawReply::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RawReply::Error(_))
    }

    /// 从 JSON 构造回复
    ///
    /// 对象只接受 `{"error": "..."}` 与 `{"status": "..."}` 两种形式。
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        Ok(match value {
            Json::Null => RawReply::Nil,
            Json::Bool(b) => RawReply::Bulk(b.to_string()),
            Json::Number(n) => match n.as_i64() {
                Some(v) => RawReply::Integer(v),
                None => RawReply::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => RawReply::Bulk(s),
            Json::Array(items) => RawReply::Array(
                items
                    .into_iter()
                    .map(RawReply::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Json::Object(mut map) => {
                if let Some(Json::String(msg)) = map.remove("error") {
                    RawReply::Error(msg)
                } else if let Some(Json::String(status)) = map.remove("status") {
                    RawReply::Status(status)
                } else {
                    return Err(Error::malformed("JSON 对象必须是 {\"error\"} 或 {\"status\"}"));
                }
            }
        })
    }
}

impl TryFrom<serde_json::Value> for RawReply {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        RawReply::from_json(value)
    }
}

impl From<&str> for RawReply {
    fn from(s: &str) -> Self {
        RawReply::Bulk(s.to_string())
    }
}

impl From<i64> for RawReply {
    fn from(v: i64) -> Self {
        RawReply::Integer(v)
    }
}

impl From<Vec<RawReply>> for RawReply {
    fn from(items: Vec<RawReply>) -> Self {
        RawReply::Array(items)
    }
}
