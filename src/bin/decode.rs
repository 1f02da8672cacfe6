//! GraphReply 离线解码工具
//!
//! 读取 JSON 形式的原始响应，用给定的 schema 解码后打印结果

use anyhow::Context;
use clap::Parser;
use graphreply::cli::{PrintMode, Printer};
use graphreply::{RawReply, ResultSet, SchemaCache, StaticSchema};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "graphreply-decode")]
#[command(about = "解码紧凑格式的图查询响应", version)]
struct Args {
    /// 原始响应 JSON 文件，省略时从标准输入读取
    #[arg(short, long)]
    reply: Option<PathBuf>,

    /// schema JSON 文件 {"labels": [...], "relationship_types": [...], "property_keys": [...]}
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// 垂直显示
    #[arg(short = 'G', long, conflicts_with = "json")]
    vertical: bool,

    /// 每条记录输出一行 JSON
    #[arg(short, long)]
    json: bool,

    /// 最大解析尝试次数（至少 2）
    #[arg(long, default_value_t = graphreply::schema::DEFAULT_MAX_RESOLVE_ATTEMPTS)]
    max_attempts: usize,

    /// 输出解码指标
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let reply = match &args.reply {
        Some(path) => load_reply(path)?,
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("读取标准输入失败")?;
            parse_reply(&input)?
        }
    };
    let schema = match &args.schema {
        Some(path) => load_schema(path)?,
        None => StaticSchema::default(),
    };

    let cache = SchemaCache::with_max_attempts(Arc::new(schema), args.max_attempts);
    let result = ResultSet::parse_response(&reply, &cache).await?;

    let mode = if args.json {
        PrintMode::Json
    } else if args.vertical {
        PrintMode::Vertical
    } else {
        PrintMode::Table
    };
    let printer = Printer::new(mode).with_color(io::stdout().is_terminal());
    print!("{}", printer.print_result(&result)?);

    if args.metrics {
        eprint!("{}", cache.metrics().to_prometheus());
    }
    Ok(())
}

fn parse_reply(text: &str) -> anyhow::Result<RawReply> {
    let json: serde_json::Value = serde_json::from_str(text).context("响应不是合法 JSON")?;
    Ok(RawReply::from_json(json)?)
}

fn load_reply(path: &Path) -> anyhow::Result<RawReply> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取响应文件 {}", path.display()))?;
    parse_reply(&text)
}

fn load_schema(path: &Path) -> anyhow::Result<StaticSchema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取 schema 文件 {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("无效 schema 文件 {}", path.display()))
}
