//! 查询结果集
//!
//! 原始响应有两种形状：
//! - `[statsLines]`：没有表头和数据行（删除、建索引等操作）
//! - `[headerCells, rowCells, statsLines]`
//!
//! 结果集从一次响应构造，之后只读；游标只能向前移动。

use super::decoder::ReplyDecoder;
use super::record::Record;
use super::statistics::Statistics;
use crate::error::{Error, Result};
use crate::protocol::{ColumnType, RawReply};
use crate::schema::SchemaCache;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// 结果集状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultSetState {
    /// 尚未从响应填充
    Empty,
    /// 已解析，游标尚未越过最后一条记录
    Parsed,
    /// 游标已越过最后一条记录
    Exhausted,
}

/// 查询结果集
#[derive(Debug, Clone)]
pub struct ResultSet {
    header: Arc<[String]>,
    records: Vec<Record>,
    position: usize,
    statistics: Statistics,
    parsed: bool,
}

impl Default for ResultSet {
    fn default() -> Self {
        Self {
            header: Arc::from(Vec::new()),
            records: Vec::new(),
            position: 0,
            statistics: Statistics::default(),
            parsed: false,
        }
    }
}

impl ResultSet {
    /// 空结果集（`Empty` 状态）
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析一次查询的原始响应
    ///
    /// 服务端错误以 `Error::Server` 原样返回；单元格级别的解码异常不会导致失败。
    pub async fn parse_response(reply: &RawReply, schema: &SchemaCache) -> Result<Self> {
        if let Some(msg) = reply.error_message() {
            return Err(Error::Server(msg.to_string()));
        }

        let parts = match reply {
            RawReply::Array(parts) => parts,
            // 部分命令（例如删除图）直接返回一行状态文本
            RawReply::Bulk(line) | RawReply::Status(line) => {
                return Ok(Self::statistics_only(vec![line.clone()]));
            }
            other => {
                return Err(Error::malformed(format!("响应不是数组: {:?}", other)));
            }
        };

        if let Some(msg) = parts.last().and_then(RawReply::error_message) {
            return Err(Error::Server(msg.to_string()));
        }

        match parts.as_slice() {
            [stats] => Ok(Self::statistics_only(parse_stat_lines(stats)?)),
            [header, rows, stats] => {
                let statistics = parse_stat_lines(stats)?;
                let columns = parse_header(header)?;
                let names: Arc<[String]> = columns
                    .iter()
                    .map(|(_, name)| name.clone())
                    .collect::<Vec<_>>()
                    .into();
                let types: Vec<ColumnType> = columns.into_iter().map(|(ty, _)| ty).collect();

                let records = decode_rows(rows, &names, &types, schema).await?;
                schema.metrics().record_rows(records.len());
                debug!(columns = names.len(), rows = records.len(), "响应解析完成");

                Ok(Self {
                    header: names,
                    records,
                    position: 0,
                    statistics: Statistics::new(statistics),
                    parsed: true,
                })
            }
            _ => Err(Error::malformed(format!(
                "响应应包含 1 或 3 个部分, 实际为 {}",
                parts.len()
            ))),
        }
    }

    fn statistics_only(lines: Vec<String>) -> Self {
        Self {
            statistics: Statistics::new(lines),
            parsed: true,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ResultSetState {
        if !self.parsed {
            ResultSetState::Empty
        } else if self.has_next() {
            ResultSetState::Parsed
        } else {
            ResultSetState::Exhausted
        }
    }

    /// 列名（不含列类型）
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn has_next(&self) -> bool {
        self.position < self.records.len()
    }

    /// 返回游标处的记录并前移
    ///
    /// 游标越过最后一条记录后始终返回 `None`，不会返回旧数据。
    pub fn next_record(&mut self) -> Option<&Record> {
        let record = self.records.get(self.position)?;
        self.position += 1;
        Some(record)
    }

    /// 游标回到第一条记录
    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 全部记录，与游标无关
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// 表头单元格为 `[columnType, columnName]`，旧协议中也可能只有列名
fn parse_header(raw: &RawReply) -> Result<Vec<(ColumnType, String)>> {
    let cells = raw
        .as_array()
        .ok_or_else(|| Error::malformed(format!("表头不是数组: {:?}", raw)))?;

    cells
        .iter()
        .map(|cell| match cell {
            RawReply::Array(pair) => match pair.as_slice() {
                [ty, name, ..] => {
                    let ty = ty
                        .as_i64()
                        .ok_or_else(|| Error::malformed(format!("无效列类型: {:?}", ty)))?;
                    let name = name
                        .as_str()
                        .ok_or_else(|| Error::malformed(format!("无效列名: {:?}", name)))?;
                    Ok((ColumnType::from_tag(ty), name.to_string()))
                }
                _ => Err(Error::malformed(format!("无效表头单元格: {:?}", cell))),
            },
            RawReply::Bulk(name) | RawReply::Status(name) => {
                Ok((ColumnType::Scalar, name.clone()))
            }
            other => Err(Error::malformed(format!("无效表头单元格: {:?}", other))),
        })
        .collect()
}

/// 逐行按线上顺序解码
async fn decode_rows(
    raw: &RawReply,
    header: &Arc<[String]>,
    types: &[ColumnType],
    schema: &SchemaCache,
) -> Result<Vec<Record>> {
    let rows = raw
        .as_array()
        .ok_or_else(|| Error::malformed(format!("数据行不是数组: {:?}", raw)))?;
    let decoder = ReplyDecoder::new(schema);

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| Error::malformed(format!("第 {} 行不是数组", i)))?;
        if cells.len() != types.len() {
            return Err(Error::malformed(format!(
                "第 {} 行有 {} 列, 表头有 {} 列",
                i,
                cells.len(),
                types.len()
            )));
        }

        let mut values = Vec::with_capacity(cells.len());
        for (cell, &column) in cells.iter().zip(types) {
            values.push(decoder.decode_column(column, cell).await?);
        }
        records.push(Record::new(header.clone(), values));
    }
    Ok(records)
}

fn parse_stat_lines(raw: &RawReply) -> Result<Vec<String>> {
    match raw {
        RawReply::Array(lines) => lines
            .iter()
            .map(|line| match line {
                RawReply::Bulk(s) | RawReply::Status(s) => Ok(s.clone()),
                RawReply::Error(msg) => Err(Error::Server(msg.clone())),
                other => Err(Error::malformed(format!("无效统计行: {:?}", other))),
            })
            .collect(),
        RawReply::Bulk(s) | RawReply::Status(s) => Ok(vec![s.clone()]),
        RawReply::Nil => Ok(Vec::new()),
        other => Err(Error::malformed(format!("统计信息不是数组: {:?}", other))),
    }
}
