//! 单元格解码与图实体构建
//!
//! 值按类型标签分派：基本类型交给 `protocol::codec`，数组、映射、节点、边和路径在这里递归处理。
//! 节点和边中的标签、关系类型、属性键都是 schema ID，需要通过 `SchemaCache` 转换为名称。

use crate::error::{Error, Result};
use crate::graph::{Edge, Node, Path};
use crate::protocol::codec::{self, DecodeAnomaly, TaggedCell};
use crate::protocol::{ColumnType, RawReply, ValueType};
use crate::schema::{BoxFuture, SchemaCache, SchemaCategory};
use crate::types::{Properties, Value};
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::warn;

/// 响应解码器，借用图句柄共享的 schema 缓存
#[derive(Debug, Clone, Copy)]
pub struct ReplyDecoder<'a> {
    schema: &'a SchemaCache,
}

impl<'a> ReplyDecoder<'a> {
    pub fn new(schema: &'a SchemaCache) -> Self {
        Self { schema }
    }

    /// 按列声明的类型解码单元格
    ///
    /// 旧协议中 Node / Relation 列的单元格不带值类型标签；如果单元格本身带有标签，以标签为准。
    pub async fn decode_column(&self, column: ColumnType, cell: &RawReply) -> Result<Value> {
        let items = cell.as_array();
        match column {
            ColumnType::Scalar => self.decode_value(cell).await,
            ColumnType::Node if items.map_or(false, |i| i.len() >= 3) => {
                self.decode_node(cell).await.map(Value::Node)
            }
            ColumnType::Relation if items.map_or(false, |i| i.len() >= 5) => {
                self.decode_edge(cell).await.map(Value::Edge)
            }
            ColumnType::Node | ColumnType::Relation => self.decode_value(cell).await,
            ColumnType::Unknown => {
                warn!(cell = ?cell, "未知列类型");
                self.schema.metrics().record_anomaly();
                Ok(Value::Unknown)
            }
        }
    }

    /// 解码 `[typeTag, payload]` 单元格
    pub async fn decode_value(&self, cell: &RawReply) -> Result<Value> {
        let tagged = codec::split_cell(cell)?;
        self.decode_tagged(tagged).await
    }

    /// 递归入口，装箱以打破 async 递归
    fn decode_tagged<'b>(&'b self, cell: TaggedCell<'b>) -> BoxFuture<'b, Result<Value>> {
        Box::pin(async move {
            let payload = cell.payload;
            match cell.value_type {
                ValueType::Array => {
                    let Some(items) = payload.as_array() else {
                        return Ok(self.placeholder(invalid_payload("array", payload)));
                    };
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.decode_value(item).await?);
                    }
                    Ok(Value::Array(values))
                }
                ValueType::Map => {
                    let Some(items) = payload.as_array() else {
                        return Ok(self.placeholder(invalid_payload("map", payload)));
                    };
                    self.decode_map(items).await.map(Value::Map)
                }
                ValueType::Node => self.decode_node(payload).await.map(Value::Node),
                ValueType::Edge => self.decode_edge(payload).await.map(Value::Edge),
                ValueType::Path => self.decode_path(payload).await.map(Value::Path),
                _ => Ok(codec::decode_primitive(cell).unwrap_or_else(|a| self.placeholder(a))),
            }
        })
    }

    async fn decode_map(&self, items: &[RawReply]) -> Result<IndexMap<String, Value>> {
        if items.len() % 2 != 0 {
            return Err(Error::malformed(format!(
                "映射元素个数必须为偶数, 实际为 {}",
                items.len()
            )));
        }

        let mut map = IndexMap::with_capacity(items.len() / 2);
        for pair in items.chunks_exact(2) {
            let key = pair[0]
                .as_str()
                .ok_or_else(|| Error::malformed(format!("映射键不是字符串: {:?}", pair[0])))?;
            let value = self.decode_value(&pair[1]).await?;
            map.insert(key.to_string(), value);
        }
        Ok(map)
    }

    /// 解码节点 `[id, [labelId...], [[propKeyId, typeTag, value]...]]`
    ///
    /// 旧协议的单个标签 ID 会被规范化为只含一个元素的列表。
    pub async fn decode_node(&self, payload: &RawReply) -> Result<Node> {
        let items = fields(payload, 3, "node")?;
        let id = entity_id(&items[0], "node id")?;

        let label_ids: Vec<&RawReply> = match &items[1] {
            RawReply::Array(ids) => ids.iter().collect(),
            RawReply::Nil => Vec::new(),
            single => vec![single],
        };
        let mut labels: SmallVec<[String; 1]> = SmallVec::with_capacity(label_ids.len());
        for raw in label_ids {
            labels.push(self.name(SchemaCategory::Label, raw).await?);
        }

        let properties = self.decode_properties(&items[2]).await?;
        Ok(Node::new(id, labels, properties))
    }

    /// 解码边 `[id, relTypeId, srcId, dstId, [[propKeyId, typeTag, value]...]]`
    pub async fn decode_edge(&self, payload: &RawReply) -> Result<Edge> {
        let items = fields(payload, 5, "edge")?;
        let id = entity_id(&items[0], "edge id")?;
        let relation = self.name(SchemaCategory::RelationshipType, &items[1]).await?;
        let source = entity_id(&items[2], "source node id")?;
        let destination = entity_id(&items[3], "destination node id")?;
        let properties = self.decode_properties(&items[4]).await?;
        Ok(Edge::new(id, relation, source, destination, properties))
    }

    /// 解码路径 `[nodesArrayCell, edgesArrayCell]`，不校验节点与边的连接关系
    pub async fn decode_path(&self, payload: &RawReply) -> Result<Path> {
        let items = fields(payload, 2, "path")?;

        let nodes = match self.decode_value(&items[0]).await? {
            Value::Array(values) => self.collect_entities(values, Value::as_node, "node"),
            other => {
                warn!(value = %other, "路径节点列表不是数组");
                self.schema.metrics().record_anomaly();
                Vec::new()
            }
        };
        let edges = match self.decode_value(&items[1]).await? {
            Value::Array(values) => self.collect_entities(values, Value::as_edge, "edge"),
            other => {
                warn!(value = %other, "路径边列表不是数组");
                self.schema.metrics().record_anomaly();
                Vec::new()
            }
        };

        if nodes.is_empty() {
            warn!(edges = edges.len(), "路径不含任何节点");
            self.schema.metrics().record_anomaly();
        }
        Ok(Path::new(nodes, edges))
    }

    fn collect_entities<T: Clone>(
        &self,
        values: Vec<Value>,
        pick: fn(&Value) -> Option<&T>,
        kind: &'static str,
    ) -> Vec<T> {
        values
            .iter()
            .filter_map(|v| {
                let picked = pick(v).cloned();
                if picked.is_none() {
                    warn!(kind, value = %v, "路径中出现非预期的元素，已忽略");
                    self.schema.metrics().record_anomaly();
                }
                picked
            })
            .collect()
    }

    /// 属性元组为 `[propKeyId, typeTag, value]`，去掉 key 后按普通单元格解码；
    /// 也接受嵌套形式 `[propKeyId, [typeTag, value]]`
    async fn decode_properties(&self, raw: &RawReply) -> Result<Properties> {
        let tuples = match raw {
            RawReply::Array(tuples) => tuples,
            RawReply::Nil => return Ok(Properties::new()),
            other => {
                return Err(Error::malformed(format!("属性列表不是数组: {:?}", other)));
            }
        };

        let mut properties = Properties::with_capacity(tuples.len());
        for tuple in tuples {
            let items = fields(tuple, 2, "property")?;
            let key = self.name(SchemaCategory::PropertyKey, &items[0]).await?;
            let cell = match &items[1..] {
                [nested @ RawReply::Array(_)] => codec::split_cell(nested)?,
                flat => codec::split_tagged(flat)?,
            };
            let value = self.decode_tagged(cell).await?;
            properties.insert(key, value);
        }
        Ok(properties)
    }

    async fn name(&self, category: SchemaCategory, raw: &RawReply) -> Result<String> {
        let id = raw.as_u64().ok_or_else(|| {
            Error::malformed(format!("{} id 不是非负整数: {:?}", category, raw))
        })?;
        self.schema.name_of(category, id).await
    }

    fn placeholder(&self, anomaly: DecodeAnomaly) -> Value {
        warn!(%anomaly, "单元格解码失败，使用占位值");
        self.schema.metrics().record_anomaly();
        Value::Unknown
    }
}

fn invalid_payload(expected: &'static str, payload: &RawReply) -> DecodeAnomaly {
    DecodeAnomaly::InvalidPayload {
        expected,
        actual: payload.clone(),
    }
}

fn fields<'r>(raw: &'r RawReply, min: usize, what: &str) -> Result<&'r [RawReply]> {
    match raw.as_array() {
        Some(items) if items.len() >= min => Ok(items),
        _ => Err(Error::malformed(format!(
            "{} 至少需要 {} 个字段: {:?}",
            what, min, raw
        ))),
    }
}

fn entity_id(raw: &RawReply, what: &str) -> Result<u64> {
    raw.as_u64()
        .ok_or_else(|| Error::malformed(format!("{} 不是非负整数: {:?}", what, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::testing::CountingSource;
    use crate::schema::StaticSchema;
    use serde_json::json;
    use std::sync::Arc;

    fn raw(v: serde_json::Value) -> RawReply {
        RawReply::from_json(v).unwrap()
    }

    fn cache(labels: &[&str], rel_types: &[&str], keys: &[&str]) -> SchemaCache {
        let to_vec = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let source = StaticSchema {
            labels: to_vec(labels),
            relationship_types: to_vec(rel_types),
            property_keys: to_vec(keys),
        };
        SchemaCache::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_decode_nested_array_and_map() {
        let schema = cache(&[], &[], &[]);
        let decoder = ReplyDecoder::new(&schema);

        let value = decoder
            .decode_value(&raw(json!([10, ["a", [3, "1"], "b", [6, [[4, "true"], [1, null]]]]])))
            .await
            .unwrap();

        let map = value.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(map["a"], Value::Integer(1));
        assert_eq!(
            map["b"],
            Value::Array(vec![Value::Boolean(true), Value::Null])
        );
    }

    #[tokio::test]
    async fn test_scalar_round_trip() {
        let schema = cache(&[], &[], &[]);
        let decoder = ReplyDecoder::new(&schema);

        let mut map = IndexMap::new();
        map.insert("k".to_string(), Value::Double(2.5));
        let value = Value::Array(vec![
            Value::Null,
            Value::from("s"),
            Value::Integer(-7),
            Value::Boolean(false),
            Value::Map(map),
        ]);

        let encoded = codec::encode_scalar(&value).unwrap();
        assert_eq!(decoder.decode_value(&encoded).await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_unknown_tag_is_local() {
        let schema = cache(&[], &[], &[]);
        let decoder = ReplyDecoder::new(&schema);

        let value = decoder
            .decode_value(&raw(json!([6, [[2, "ok"], [99, "?"], [4, "maybe"]]])))
            .await
            .unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::from("ok"), Value::Unknown, Value::Unknown])
        );
        assert_eq!(schema.metrics().snapshot().decode_anomalies, 2);
    }

    #[tokio::test]
    async fn test_decode_node_with_preloaded_schema() {
        let schema = cache(&[], &[], &[]);
        let mut labels = vec![String::new(); 8];
        labels[7] = "person".to_string();
        schema.preload(SchemaCategory::Label, labels);
        schema.preload(
            SchemaCategory::PropertyKey,
            vec!["age".to_string(), "x".to_string(), "name".to_string()],
        );
        let decoder = ReplyDecoder::new(&schema);

        let node = decoder
            .decode_node(&raw(json!([0, [7], [[2, [2, "roi"]]]])))
            .await
            .unwrap();

        assert_eq!(node.id().as_u64(), 0);
        assert_eq!(node.labels(), ["person".to_string()]);
        assert_eq!(node.properties().len(), 1);
        assert_eq!(node.property("name"), Some(&Value::from("roi")));
        assert_eq!(schema.metrics().refreshes(SchemaCategory::Label), 0);
    }

    #[tokio::test]
    async fn test_node_label_shapes() {
        let schema = cache(&["person", "employee"], &[], &[]);
        let decoder = ReplyDecoder::new(&schema);

        let legacy = decoder.decode_node(&raw(json!([1, 1, []]))).await.unwrap();
        assert_eq!(legacy.labels(), ["employee".to_string()]);

        let multi = decoder.decode_node(&raw(json!([2, [0, 1], []]))).await.unwrap();
        assert_eq!(multi.labels().len(), 2);

        let none = decoder.decode_node(&raw(json!([3, [], []]))).await.unwrap();
        assert!(none.labels().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_label_triggers_one_refresh() {
        let source = Arc::new(CountingSource::new(StaticSchema {
            labels: vec!["person".to_string()],
            property_keys: vec!["name".to_string(), "age".to_string()],
            ..Default::default()
        }));
        let schema = SchemaCache::new(source.clone());
        let decoder = ReplyDecoder::new(&schema);

        let node = decoder
            .decode_node(&raw(json!([5, [0], [[0, 2, "a"], [1, 3, 30]]])))
            .await
            .unwrap();

        assert_eq!(node.label(), Some("person"));
        assert_eq!(node.property("age"), Some(&Value::Integer(30)));
        // 标签和属性键各刷新一次
        assert_eq!(source.calls(), 2);
        assert_eq!(schema.metrics().refreshes(SchemaCategory::Label), 1);
    }

    #[tokio::test]
    async fn test_decode_edge() {
        let schema = cache(&[], &["knows", "works_with"], &["since"]);
        let decoder = ReplyDecoder::new(&schema);

        let edge = decoder
            .decode_edge(&raw(json!([9, 1, 0, 4, [[0, 3, "2019"]]])))
            .await
            .unwrap();

        assert_eq!(edge.id().as_u64(), 9);
        assert_eq!(edge.relation_type(), "works_with");
        assert_eq!(edge.source_node_id().as_u64(), 0);
        assert_eq!(edge.dest_node_id().as_u64(), 4);
        assert_eq!(edge.property("since"), Some(&Value::Integer(2019)));
    }

    #[tokio::test]
    async fn test_decode_path() {
        let schema = cache(&["L"], &["R"], &[]);
        let decoder = ReplyDecoder::new(&schema);

        let path = decoder
            .decode_value(&raw(json!([9, [
                [6, [[8, [0, [0], []]], [8, [1, [0], []]], [8, [2, [0], []]]]],
                [6, [[7, [10, 0, 0, 1, []]], [7, [11, 0, 2, 1, []]]]]
            ]])))
            .await
            .unwrap();

        let path = path.as_path().unwrap();
        assert_eq!(path.node_count(), 3);
        assert_eq!(path.edge_count(), path.node_count() - 1);
        // 边方向与遍历方向相反时原样保留
        assert_eq!(path.edge(1).unwrap().source_node_id().as_u64(), 2);
    }

    #[tokio::test]
    async fn test_degenerate_path_counts_anomalies() {
        let schema = cache(&[], &[], &[]);
        let decoder = ReplyDecoder::new(&schema);

        // 节点列表不是数组，且路径因此没有节点
        let path = decoder
            .decode_value(&raw(json!([9, [[2, "x"], [6, []]]])))
            .await
            .unwrap();
        assert_eq!(path.as_path().unwrap().node_count(), 0);
        assert_eq!(schema.metrics().snapshot().decode_anomalies, 2);

        // 边列表不是数组
        let path = decoder
            .decode_value(&raw(json!([9, [[6, [[8, [0, [], []]]]], [3, 1]]])))
            .await
            .unwrap();
        assert_eq!(path.as_path().unwrap().node_count(), 1);
        assert_eq!(schema.metrics().snapshot().decode_anomalies, 3);

        // 空节点列表
        decoder
            .decode_value(&raw(json!([9, [[6, []], [6, []]]])))
            .await
            .unwrap();
        assert_eq!(schema.metrics().snapshot().decode_anomalies, 4);
    }

    #[tokio::test]
    async fn test_legacy_column_dispatch() {
        let schema = cache(&["L"], &["R"], &["p"]);
        let decoder = ReplyDecoder::new(&schema);

        let node = decoder
            .decode_column(ColumnType::Node, &raw(json!([1, [0], [[0, 2, "v"]]])))
            .await
            .unwrap();
        assert_eq!(node.as_node().unwrap().property("p"), Some(&Value::from("v")));

        let edge = decoder
            .decode_column(ColumnType::Relation, &raw(json!([2, 0, 1, 1, []])))
            .await
            .unwrap();
        assert_eq!(edge.as_edge().unwrap().relation_type(), "R");

        // 单元格自带标签时以标签为准
        let tagged = decoder
            .decode_column(ColumnType::Node, &raw(json!([2, "scalar"])))
            .await
            .unwrap();
        assert_eq!(tagged, Value::from("scalar"));

        let unknown = decoder
            .decode_column(ColumnType::Unknown, &raw(json!([2, "x"])))
            .await
            .unwrap();
        assert_eq!(unknown, Value::Unknown);
    }

    #[tokio::test]
    async fn test_malformed_entities() {
        let schema = cache(&["L"], &[], &[]);
        let decoder = ReplyDecoder::new(&schema);

        assert!(decoder.decode_node(&raw(json!([1, [0]]))).await.is_err());
        assert!(decoder.decode_node(&raw(json!([-1, [0], []]))).await.is_err());
        assert!(decoder.decode_edge(&raw(json!([1, 0, 0]))).await.is_err());
        assert!(decoder
            .decode_value(&raw(json!([10, ["dangling"]])))
            .await
            .is_err());
    }
}
