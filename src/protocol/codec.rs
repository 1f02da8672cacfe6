//! 标量编解码
//!
//! 单元格格式为 `[typeTag, payload]`。这里只处理不引用 schema 的基本类型，
//! 数组、映射和图实体由 `result::decoder` 异步递归处理。

use super::{RawReply, ValueType};
use crate::error::{Error, Result};
use crate::types::Value;
use thiserror::Error;

static NIL: RawReply = RawReply::Nil;

/// 单元格级别的解码异常，不会中断整行解码
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeAnomaly {
    #[error("未知值类型标签: {0}")]
    UnknownTag(i64),

    #[error("无效布尔值: {0:?}")]
    InvalidBoolean(String),

    #[error("无效数值: {0:?}")]
    InvalidNumber(String),

    #[error("{0} 不是基本类型")]
    NotPrimitive(ValueType),

    #[error("无效负载: 期望 {expected}, 实际 {actual:?}")]
    InvalidPayload {
        expected: &'static str,
        actual: RawReply,
    },
}

/// 拆分后的带标签单元格
#[derive(Debug, Clone, Copy)]
pub struct TaggedCell<'a> {
    pub tag: i64,
    pub value_type: ValueType,
    pub payload: &'a RawReply,
}

/// 拆分 `[typeTag, payload]` 单元格
pub fn split_cell(cell: &RawReply) -> Result<TaggedCell<'_>> {
    let items = cell
        .as_array()
        .ok_or_else(|| Error::malformed(format!("单元格不是数组: {:?}", cell)))?;
    split_tagged(items)
}

/// 拆分 `[typeTag, payload]` 切片；属性元组去掉 key 后也是这种形状
pub fn split_tagged(items: &[RawReply]) -> Result<TaggedCell<'_>> {
    let tag = items
        .first()
        .and_then(RawReply::as_i64)
        .ok_or_else(|| Error::malformed(format!("单元格缺少类型标签: {:?}", items)))?;
    Ok(TaggedCell {
        tag,
        value_type: ValueType::from_tag(tag),
        payload: items.get(1).unwrap_or(&NIL),
    })
}

/// 解码基本类型单元格
pub fn decode_primitive(cell: TaggedCell<'_>) -> std::result::Result<Value, DecodeAnomaly> {
    let payload = cell.payload;
    match cell.value_type {
        ValueType::Null => Ok(Value::Null),
        ValueType::String => match payload {
            RawReply::Bulk(s) | RawReply::Status(s) => Ok(Value::String(s.clone())),
            RawReply::Integer(v) => Ok(Value::String(v.to_string())),
            RawReply::Double(v) => Ok(Value::String(v.to_string())),
            other => Err(DecodeAnomaly::InvalidPayload {
                expected: "string",
                actual: other.clone(),
            }),
        },
        ValueType::Integer => parse_integer(payload),
        ValueType::Double => parse_double(payload).map(Value::Double),
        ValueType::Boolean => parse_boolean(payload).map(Value::Boolean),
        ValueType::Unknown => Err(DecodeAnomaly::UnknownTag(cell.tag)),
        composite => Err(DecodeAnomaly::NotPrimitive(composite)),
    }
}

fn parse_integer(payload: &RawReply) -> std::result::Result<Value, DecodeAnomaly> {
    match payload {
        RawReply::Integer(v) => Ok(Value::Integer(*v)),
        RawReply::Double(v) => Ok(Value::Double(*v)),
        RawReply::Bulk(s) | RawReply::Status(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Ok(Value::Integer(v));
            }
            // 超出 i64 范围时退化为浮点
            s.parse::<f64>()
                .map(Value::Double)
                .map_err(|_| DecodeAnomaly::InvalidNumber(s.to_string()))
        }
        other => Err(DecodeAnomaly::InvalidPayload {
            expected: "integer",
            actual: other.clone(),
        }),
    }
}

fn parse_double(payload: &RawReply) -> std::result::Result<f64, DecodeAnomaly> {
    match payload {
        RawReply::Double(v) => Ok(*v),
        RawReply::Integer(v) => Ok(*v as f64),
        RawReply::Bulk(s) | RawReply::Status(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| DecodeAnomaly::InvalidNumber(s.clone())),
        other => Err(DecodeAnomaly::InvalidPayload {
            expected: "double",
            actual: other.clone(),
        }),
    }
}

fn parse_boolean(payload: &RawReply) -> std::result::Result<bool, DecodeAnomaly> {
    match payload.as_str() {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(DecodeAnomaly::InvalidBoolean(other.to_string())),
        None => Err(DecodeAnomaly::InvalidBoolean(format!("{:?}", payload))),
    }
}

/// 将标量值编码为线上单元格；图实体和占位值无法编码
pub fn encode_scalar(value: &Value) -> Option<RawReply> {
    let tagged = |ty: ValueType, payload: RawReply| {
        RawReply::Array(vec![RawReply::Integer(ty.tag()), payload])
    };

    Some(match value {
        Value::Null => tagged(ValueType::Null, RawReply::Nil),
        Value::String(s) => tagged(ValueType::String, RawReply::Bulk(s.clone())),
        Value::Integer(v) => tagged(ValueType::Integer, RawReply::Integer(*v)),
        Value::Double(v) => tagged(ValueType::Double, RawReply::Bulk(v.to_string())),
        Value::Boolean(v) => tagged(ValueType::Boolean, RawReply::Bulk(v.to_string())),
        Value::Array(items) => tagged(
            ValueType::Array,
            RawReply::Array(items.iter().map(encode_scalar).collect::<Option<Vec<_>>>()?),
        ),
        Value::Map(map) => {
            let mut flat = Vec::with_capacity(map.len() * 2);
            for (k, v) in map {
                flat.push(RawReply::Bulk(k.clone()));
                flat.push(encode_scalar(v)?);
            }
            tagged(ValueType::Map, RawReply::Array(flat))
        }
        Value::Node(_) | Value::Edge(_) | Value::Path(_) | Value::Unknown => return None,
    })
}
