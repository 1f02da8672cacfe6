//! 图句柄
//!
//! `Graph` 绑定一个图名、一个传输层和一份 schema 缓存。查询总是以 `--compact`
//! 形式发送，响应交给 `ResultSet` 解析；schema 名称通过 `db.labels()` 等过程获取。

use crate::error::{Error, Result};
use crate::metrics::DecodeMetrics;
use crate::protocol::codec;
use crate::protocol::RawReply;
use crate::result::ResultSet;
use crate::schema::{
    BoxFuture, SchemaCache, SchemaCategory, SchemaSource, DEFAULT_MAX_RESOLVE_ATTEMPTS,
};
use crate::types::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const QUERY_COMMAND: &str = "GRAPH.QUERY";
pub const RO_QUERY_COMMAND: &str = "GRAPH.RO_QUERY";
pub const DELETE_COMMAND: &str = "GRAPH.DELETE";

/// 发送命令并返回原始响应的传输层
///
/// 连接管理、认证和重连都由实现方负责；服务端错误应以 `RawReply::Error` 返回。
pub trait Transport: Send + Sync + 'static {
    fn send_command(&self, command: &'static str, args: Vec<String>)
        -> BoxFuture<'_, Result<RawReply>>;
}

impl<T: Transport> Transport for Arc<T> {
    fn send_command(
        &self,
        command: &'static str,
        args: Vec<String>,
    ) -> BoxFuture<'_, Result<RawReply>> {
        (**self).send_command(command, args)
    }
}

/// 图句柄配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// schema ID 最大解析尝试次数
    pub max_resolve_attempts: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_resolve_attempts: DEFAULT_MAX_RESOLVE_ATTEMPTS,
        }
    }
}

/// 通过过程调用列出 schema 名称
///
/// 只持有传输层，不回指 `Graph`，因此不会和缓存形成引用环。
struct ProcedureSource<T> {
    graph: String,
    transport: Arc<T>,
}

impl<T: Transport> ProcedureSource<T> {
    async fn fetch(&self, category: SchemaCategory) -> Result<Vec<String>> {
        let query = format!("CALL {}()", category.procedure());
        let reply = self
            .transport
            .send_command(QUERY_COMMAND, vec![self.graph.clone(), query, "--compact".into()])
            .await?;
        let names = first_column_strings(&reply)?;
        debug!(%category, count = names.len(), "schema 名称已获取");
        Ok(names)
    }
}

impl<T: Transport> SchemaSource for ProcedureSource<T> {
    fn fetch_names(&self, category: SchemaCategory) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(self.fetch(category))
    }
}

/// 取过程结果每行的第一列
///
/// 这里的值都是字符串，直接用基本类型解码，不经过 schema 缓存。
fn first_column_strings(reply: &RawReply) -> Result<Vec<String>> {
    if let Some(msg) = reply.error_message() {
        return Err(Error::Server(msg.to_string()));
    }
    let parts = reply
        .as_array()
        .ok_or_else(|| Error::malformed(format!("过程响应不是数组: {:?}", reply)))?;
    if let Some(msg) = parts.last().and_then(RawReply::error_message) {
        return Err(Error::Server(msg.to_string()));
    }
    let rows = match parts {
        [_, rows, _] => rows
            .as_array()
            .ok_or_else(|| Error::malformed("过程数据行不是数组"))?,
        [_] => return Ok(Vec::new()),
        _ => {
            return Err(Error::malformed(format!(
                "过程响应应包含 3 个部分, 实际为 {}",
                parts.len()
            )))
        }
    };

    rows.iter()
        .map(|row| -> Result<String> {
            let cell = row
                .as_array()
                .and_then(|cells| cells.first())
                .ok_or_else(|| Error::malformed(format!("过程结果行为空: {:?}", row)))?;
            let name = match cell {
                RawReply::Array(_) => match codec::decode_primitive(codec::split_cell(cell)?) {
                    Ok(Value::String(name)) => name,
                    Ok(other) => other.to_string(),
                    Err(anomaly) => return Err(Error::malformed(anomaly.to_string())),
                },
                other => other
                    .as_str()
                    .ok_or_else(|| Error::malformed(format!("无效名称: {:?}", other)))?
                    .to_string(),
            };
            Ok(name)
        })
        .collect()
}

/// 图句柄
pub struct Graph<T: Transport> {
    name: String,
    transport: Arc<T>,
    schema: Arc<SchemaCache>,
    config: GraphConfig,
}

impl<T: Transport> Graph<T> {
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        Self::with_config(name, transport, GraphConfig::default())
    }

    pub fn with_config(name: impl Into<String>, transport: T, config: GraphConfig) -> Self {
        let name = name.into();
        let transport = Arc::new(transport);
        let source = ProcedureSource {
            graph: name.clone(),
            transport: transport.clone(),
        };
        let schema = Arc::new(SchemaCache::with_max_attempts(
            Arc::new(source),
            config.max_resolve_attempts,
        ));
        Self {
            name,
            transport,
            schema,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// 共享的 schema 缓存
    pub fn schema(&self) -> &Arc<SchemaCache> {
        &self.schema
    }

    pub fn metrics(&self) -> &DecodeMetrics {
        self.schema.metrics()
    }

    /// 执行查询
    pub async fn query(&self, query: &str) -> Result<ResultSet> {
        self.run(QUERY_COMMAND, query.to_string()).await
    }

    /// 执行带参数的查询，参数以 `CYPHER k=v ...` 前缀传递
    pub async fn query_with_params(
        &self,
        query: &str,
        params: &IndexMap<String, Value>,
    ) -> Result<ResultSet> {
        let query = format!("{}{}", params_header(params)?, query);
        self.run(QUERY_COMMAND, query).await
    }

    /// 执行只读查询
    pub async fn read_only_query(&self, query: &str) -> Result<ResultSet> {
        self.run(RO_QUERY_COMMAND, query.to_string()).await
    }

    pub async fn read_only_query_with_params(
        &self,
        query: &str,
        params: &IndexMap<String, Value>,
    ) -> Result<ResultSet> {
        let query = format!("{}{}", params_header(params)?, query);
        self.run(RO_QUERY_COMMAND, query).await
    }

    /// 调用过程：`CALL name(args) YIELD y1,y2`
    pub async fn call_procedure(
        &self,
        procedure: &str,
        args: &[&str],
        yields: &[&str],
    ) -> Result<ResultSet> {
        let mut query = format!("CALL {}({})", procedure, args.join(","));
        if !yields.is_empty() {
            query.push_str(" YIELD ");
            query.push_str(&yields.join(","));
        }
        self.query(&query).await
    }

    /// 删除整个图，并清空本地 schema 缓存
    pub async fn delete_graph(&self) -> Result<ResultSet> {
        let reply = self
            .transport
            .send_command(DELETE_COMMAND, vec![self.name.clone()])
            .await?;
        self.schema.clear();
        ResultSet::parse_response(&reply, &self.schema).await
    }

    /// 刷新并返回全部标签
    pub async fn labels(&self) -> Result<Vec<String>> {
        self.schema.refresh(SchemaCategory::Label).await
    }

    pub async fn relationship_types(&self) -> Result<Vec<String>> {
        self.schema.refresh(SchemaCategory::RelationshipType).await
    }

    pub async fn property_keys(&self) -> Result<Vec<String>> {
        self.schema.refresh(SchemaCategory::PropertyKey).await
    }

    #[instrument(level = "debug", skip(self, query), fields(graph = %self.name))]
    async fn run(&self, command: &'static str, query: String) -> Result<ResultSet> {
        let reply = self
            .transport
            .send_command(command, vec![self.name.clone(), query, "--compact".into()])
            .await?;
        ResultSet::parse_response(&reply, &self.schema).await
    }
}

/// 构造参数前缀 `CYPHER a=1 b="x" `
pub fn params_header(params: &IndexMap<String, Value>) -> Result<String> {
    let mut header = String::from("CYPHER");
    for (key, value) in params {
        header.push(' ');
        header.push_str(key);
        header.push('=');
        header.push_str(&param_to_string(value)?);
    }
    header.push(' ');
    Ok(header)
}

/// 参数值的查询文本形式；图实体不能作为参数
pub fn param_to_string(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "null".to_string(),
        Value::String(s) => {
            let mut quoted = String::with_capacity(s.len() + 2);
            quoted.push('"');
            for c in s.chars() {
                if matches!(c, '\\' | '"' | '\'') {
                    quoted.push('\\');
                }
                quoted.push(c);
            }
            quoted.push('"');
            quoted
        }
        Value::Integer(_) | Value::Double(_) | Value::Boolean(_) => value.to_string(),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(param_to_string)
                .collect::<Result<Vec<_>>>()?;
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            let entries = map
                .iter()
                .map(|(k, v)| -> Result<String> {
                    Ok(format!("{}: {}", k, param_to_string(v)?))
                })
                .collect::<Result<Vec<_>>>()?;
            format!("{{{}}}", entries.join(", "))
        }
        other => {
            return Err(Error::InvalidParameter(format!(
                "{} 不能作为查询参数",
                other.type_name()
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;

    /// 记录命令并按顺序返回预设响应
    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<(String, Vec<String>)>>,
        replies: Mutex<VecDeque<serde_json::Value>>,
    }

    impl MockTransport {
        fn with_replies(replies: Vec<serde_json::Value>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            }
        }

        fn sent(&self) -> Vec<(String, Vec<String>)> {
            self.sent.lock().clone()
        }
    }

    impl Transport for MockTransport {
        fn send_command(
            &self,
            command: &'static str,
            args: Vec<String>,
        ) -> BoxFuture<'_, Result<RawReply>> {
            self.sent.lock().push((command.to_string(), args));
            let next = self.replies.lock().pop_front();
            Box::pin(async move {
                match next {
                    Some(reply) => RawReply::from_json(reply),
                    None => Err(Error::Transport("连接已关闭".into())),
                }
            })
        }
    }

    fn names_reply(names: &[&str]) -> serde_json::Value {
        let rows: Vec<_> = names.iter().map(|n| json!([[2, n]])).collect();
        json!([[[1, "name"]], rows, ["Query internal execution time: 0.1 ms"]])
    }

    #[tokio::test]
    async fn test_query_sends_compact_command() {
        let transport = Arc::new(MockTransport::with_replies(vec![json!([
            [[1, "x"]],
            [[[3, 7]]],
            []
        ])]));
        let graph = Graph::new("social", transport.clone());

        let rs = graph.query("RETURN 7 AS x").await.unwrap();
        assert_eq!(rs.records()[0].get("x"), Some(&Value::Integer(7)));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "GRAPH.QUERY");
        assert_eq!(sent[0].1, ["social", "RETURN 7 AS x", "--compact"]);
    }

    #[tokio::test]
    async fn test_unknown_label_fetched_through_procedure() {
        let transport = Arc::new(MockTransport::with_replies(vec![
            json!([[[1, "n"]], [[[8, [0, [0], []]]]], []]),
            names_reply(&["person"]),
        ]));
        let graph = Graph::new("social", transport.clone());

        let rs = graph.read_only_query("MATCH (n) RETURN n").await.unwrap();
        let node: &Node = rs.records()[0].get("n").unwrap().as_node().unwrap();
        assert_eq!(node.label(), Some("person"));

        let sent = transport.sent();
        assert_eq!(sent[0].0, "GRAPH.RO_QUERY");
        assert_eq!(sent[1].0, "GRAPH.QUERY");
        assert_eq!(sent[1].1[1], "CALL db.labels()");
        assert_eq!(graph.metrics().refreshes(SchemaCategory::Label), 1);
    }

    #[tokio::test]
    async fn test_schema_listing() {
        let transport = MockTransport::with_replies(vec![
            names_reply(&["visited", "knows"]),
            names_reply(&["name", "age"]),
            names_reply(&[]),
        ]);
        let graph = Graph::new("g", transport);

        assert_eq!(graph.relationship_types().await.unwrap(), ["visited", "knows"]);
        assert_eq!(graph.property_keys().await.unwrap(), ["name", "age"]);
        assert!(graph.labels().await.unwrap().is_empty());
        assert_eq!(
            graph.schema().lookup(SchemaCategory::PropertyKey, 1),
            Some("age".to_string())
        );
    }

    #[tokio::test]
    async fn test_call_procedure_text() {
        let transport = Arc::new(MockTransport::with_replies(vec![names_reply(&[])]));
        let graph = Graph::new("g", transport.clone());

        graph
            .call_procedure("db.idx.fulltext.queryNodes", &["'L'", "'x'"], &["node"])
            .await
            .unwrap();
        assert_eq!(
            transport.sent()[0].1[1],
            "CALL db.idx.fulltext.queryNodes('L','x') YIELD node"
        );
    }

    #[tokio::test]
    async fn test_delete_graph_clears_schema() {
        let transport = MockTransport::with_replies(vec![json!(
            "Graph removed, internal execution time: 0.5 milliseconds"
        )]);
        let graph = Graph::new("g", transport);
        graph
            .schema()
            .preload(SchemaCategory::Label, vec!["person".into()]);

        let rs = graph.delete_graph().await.unwrap();
        assert!(rs.is_empty());
        assert!(graph.schema().names(SchemaCategory::Label).is_empty());
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let transport = MockTransport::with_replies(vec![json!({"error": "Unknown function 'foo'"})]);
        let graph = Graph::new("g", transport);

        let err = graph.query("RETURN foo()").await.unwrap_err();
        assert!(err.is_server_error());

        // 预设响应已用完
        let err = graph.query("RETURN 1").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_query_with_params() {
        let transport = Arc::new(MockTransport::with_replies(vec![json!([["Nodes created: 1"]])]));
        let graph = Graph::new("g", transport.clone());

        let mut params = IndexMap::new();
        params.insert("name".to_string(), Value::from("O'Brien"));
        params.insert("age".to_string(), Value::Integer(3));
        let rs = graph
            .query_with_params("CREATE (:P {name: $name, age: $age})", &params)
            .await
            .unwrap();
        assert_eq!(rs.statistics().nodes_created(), 1);
        assert_eq!(
            transport.sent()[0].1[1],
            r#"CYPHER name="O\'Brien" age=3 CREATE (:P {name: $name, age: $age})"#
        );
    }

    #[test]
    fn test_param_to_string() {
        assert_eq!(param_to_string(&Value::Null).unwrap(), "null");
        assert_eq!(param_to_string(&Value::from("a\"b")).unwrap(), r#""a\"b""#);
        assert_eq!(
            param_to_string(&Value::Array(vec![Value::Integer(1), Value::from("x")])).unwrap(),
            r#"[1, "x"]"#
        );
        assert_eq!(param_to_string(&Value::Boolean(true)).unwrap(), "true");

        let node = Value::Node(Node::new(0u64, ["L"], Default::default()));
        assert!(matches!(
            param_to_string(&node),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_first_column_strings() {
        let reply = RawReply::from_json(names_reply(&["a", "b"])).unwrap();
        assert_eq!(first_column_strings(&reply).unwrap(), ["a", "b"]);

        let legacy = RawReply::from_json(json!([["label"], [["a"], ["b"]], []])).unwrap();
        assert_eq!(first_column_strings(&legacy).unwrap(), ["a", "b"]);

        let bad = RawReply::from_json(json!([[], [[]], []])).unwrap();
        assert!(first_column_strings(&bad).is_err());
    }
}
