//! 结果打印器
//!
//! 提供表格、垂直和 JSON 格式的结果输出

use crate::error::Result;
use crate::result::{ResultSet, Statistics};
use crate::types::Value;
use colored::Colorize;
use indexmap::IndexMap;
use prettytable::{format, row, Cell, Row, Table};

/// 打印模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// 表格模式
    Table,
    /// 垂直模式
    Vertical,
    /// 每条记录输出为一个 JSON 对象
    Json,
}

/// 结果打印器
#[derive(Debug, Clone)]
pub struct Printer {
    mode: PrintMode,
    color: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(PrintMode::Table)
    }
}

impl Printer {
    pub fn new(mode: PrintMode) -> Self {
        Self { mode, color: false }
    }

    /// 是否为表头和统计标签着色
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn set_mode(&mut self, mode: PrintMode) {
        self.mode = mode;
    }

    /// 打印结果集和统计信息
    pub fn print_result(&self, result: &ResultSet) -> Result<String> {
        let execution_time = result.statistics().query_execution_time();

        let mut output = if result.header().is_empty() || result.is_empty() {
            format!("Empty set ({} ms)\n", execution_time)
        } else {
            let body = match self.mode {
                PrintMode::Table => self.format_table(result),
                PrintMode::Vertical => self.format_vertical(result),
                PrintMode::Json => self.format_json(result)?,
            };
            format!(
                "{}\n{} row(s) in set ({} ms)\n",
                body,
                result.size(),
                execution_time
            )
        };

        if !result.statistics().is_empty() {
            output.push('\n');
            output.push_str(&self.print_stats(result.statistics()));
        }
        Ok(output)
    }

    /// 表格格式
    fn format_table(&self, result: &ResultSet) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        let header: Vec<Cell> = result
            .header()
            .iter()
            .map(|c| Cell::new(&self.paint(c)))
            .collect();
        table.set_titles(Row::new(header));

        for record in result {
            let cells: Vec<Cell> = record
                .values()
                .iter()
                .map(|v| Cell::new(&cell_text(v)))
                .collect();
            table.add_row(Row::new(cells));
        }

        table.to_string()
    }

    /// 垂直格式
    fn format_vertical(&self, result: &ResultSet) -> String {
        let columns = result.header();
        let width = columns.iter().map(|c| c.chars().count()).max().unwrap_or(0);
        let mut output = String::new();

        for (i, record) in result.iter().enumerate() {
            output.push_str(&format!(
                "*************************** {}. row ***************************\n",
                i + 1
            ));
            for (col, value) in record.iter() {
                let padded = format!("{:>width$}", col, width = width);
                output.push_str(&format!("{}: {}\n", self.paint(&padded), cell_text(value)));
            }
        }

        output
    }

    fn format_json(&self, result: &ResultSet) -> Result<String> {
        let mut lines = Vec::with_capacity(result.size());
        for record in result {
            let object: IndexMap<&str, &Value> = record.iter().collect();
            lines.push(serde_json::to_string(&object)?);
        }
        Ok(lines.join("\n"))
    }

    /// 打印统计信息
    pub fn print_stats(&self, stats: &Statistics) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row![self.paint("Statistic"), self.paint("Value")]);
        for (label, value) in stats.iter() {
            table.add_row(row![label, value]);
        }
        table.to_string()
    }

    fn paint(&self, text: &str) -> String {
        if self.color {
            text.bold().cyan().to_string()
        } else {
            text.to_string()
        }
    }
}

/// 单元格文本；Null 显示为 NULL 以区别于字符串 "null"
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
