//! Schema 名称来源

use super::{BoxFuture, SchemaCategory};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// 列出某类别全部名称的外部能力，返回值下标即 ID
pub trait SchemaSource: Send + Sync {
    fn fetch_names(&self, category: SchemaCategory) -> BoxFuture<'_, Result<Vec<String>>>;
}

/// 内存中的固定 schema，用于离线解码
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticSchema {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub relationship_types: Vec<String>,
    #[serde(default)]
    pub property_keys: Vec<String>,
}

impl StaticSchema {
    pub fn names(&self, category: SchemaCategory) -> &[String] {
        match category {
            SchemaCategory::Label => &self.labels,
            SchemaCategory::RelationshipType => &self.relationship_types,
            SchemaCategory::PropertyKey => &self.property_keys,
        }
    }
}

impl SchemaSource for StaticSchema {
    fn fetch_names(&self, category: SchemaCategory) -> BoxFuture<'_, Result<Vec<String>>> {
        let names = self.names(category).to_vec();
        Box::pin(async move { Ok(names) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_schema_from_json() {
        let schema: StaticSchema =
            serde_json::from_str(r#"{"labels": ["person"], "property_keys": ["name", "age"]}"#)
                .unwrap();
        assert_eq!(schema.names(SchemaCategory::Label), ["person".to_string()]);
        assert!(schema.names(SchemaCategory::RelationshipType).is_empty());

        let names =
            tokio_test::block_on(schema.fetch_names(SchemaCategory::PropertyKey)).unwrap();
        assert_eq!(names, vec!["name".to_string(), "age".to_string()]);
    }
}
