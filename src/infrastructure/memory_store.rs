//! 进程内存储
//!
//! 语义与 Supabase 表保持一致：写入时生成 `id`，upsert 按冲突键合并。
//! 用于测试和 `--memory` 离线试跑。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use super::store::{Store, Table};
use crate::error::{PersistenceError, PersistenceResult};
use crate::models::Topic;

type Row = Map<String, JsonValue>;

/// 进程内存储
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, HashMap<Table, Vec<Row>>>> {
        self.tables
            .lock()
            .map_err(|_| PersistenceError::backend("内存存储锁已损坏"))
    }

    /// 某张表的全部记录（按写入顺序）
    pub fn rows(&self, table: Table) -> Vec<JsonValue> {
        self.lock()
            .map(|tables| {
                tables
                    .get(&table)
                    .map(|rows| rows.iter().cloned().map(JsonValue::Object).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// 某张表的记录数量
    pub fn count(&self, table: Table) -> usize {
        self.lock()
            .map(|tables| tables.get(&table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// 全部主题
    pub fn topics(&self) -> Vec<Topic> {
        self.rows(Table::Topics)
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }
}

fn into_row(table: Table, record: JsonValue) -> PersistenceResult<Row> {
    match record {
        JsonValue::Object(map) => Ok(map),
        other => Err(PersistenceError::Constraint {
            table: table.name().to_string(),
            message: format!("记录必须是 JSON 对象: {}", other),
        }),
    }
}

fn row_id(row: &Row) -> Option<Uuid> {
    row.get("id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn assign_id(mut row: Row) -> Row {
    row.insert("id".to_string(), JsonValue::String(Uuid::new_v4().to_string()));
    row
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert(
        &self,
        table: Table,
        record: JsonValue,
        conflict_key: &str,
    ) -> PersistenceResult<JsonValue> {
        let record = into_row(table, record)?;
        let key = match record.get(conflict_key) {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                return Err(PersistenceError::Constraint {
                    table: table.name().to_string(),
                    message: format!("upsert 记录缺少冲突键 {}", conflict_key),
                })
            }
        };

        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();

        if let Some(existing) = rows.iter_mut().find(|r| r.get(conflict_key) == Some(&key)) {
            for (field, value) in record {
                if field != "id" {
                    existing.insert(field, value);
                }
            }
            debug!("upsert {}: 命中已有记录 {}={}", table, conflict_key, key);
            return Ok(JsonValue::Object(existing.clone()));
        }

        let row = assign_id(record);
        rows.push(row.clone());
        debug!("upsert {}: 新建记录 {}={}", table, conflict_key, key);
        Ok(JsonValue::Object(row))
    }

    async fn insert(&self, table: Table, records: Vec<JsonValue>) -> PersistenceResult<Vec<JsonValue>> {
        let new_rows = records
            .into_iter()
            .map(|r| into_row(table, r).map(assign_id))
            .collect::<PersistenceResult<Vec<_>>>()?;

        let mut tables = self.lock()?;
        let rows = tables.entry(table).or_default();
        rows.extend(new_rows.iter().cloned());
        debug!("insert {}: {} 条", table, new_rows.len());

        Ok(new_rows.into_iter().map(JsonValue::Object).collect())
    }

    async fn update(&self, table: Table, id: Uuid, patch: JsonValue) -> PersistenceResult<()> {
        let patch = into_row(table, patch)?;
        let mut tables = self.lock()?;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| PersistenceError::NotFound {
                table: table.name().to_string(),
                id: id.to_string(),
            })?;

        for (field, value) in patch {
            if field != "id" {
                row.insert(field, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, ids: &[Uuid]) -> PersistenceResult<()> {
        let mut tables = self.lock()?;
        if let Some(rows) = tables.get_mut(&table) {
            rows.retain(|r| row_id(r).map_or(true, |id| !ids.contains(&id)));
        }
        Ok(())
    }

    async fn children_of(&self, parent_ids: &[Uuid]) -> PersistenceResult<Vec<Topic>> {
        let tables = self.lock()?;
        let Some(rows) = tables.get(&Table::Topics) else {
            return Ok(Vec::new());
        };

        rows.iter()
            .filter(|r| {
                r.get("parent_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .is_some_and(|p| parent_ids.contains(&p))
            })
            .map(|r| {
                serde_json::from_value(JsonValue::Object(r.clone())).map_err(|source| {
                    PersistenceError::Decode {
                        table: Table::Topics.name().to_string(),
                        source,
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_merges_on_conflict_key() {
        let store = MemoryStore::new();
        let first = store
            .upsert(Table::Topics, json!({"name": "Rust", "slug": "rust", "description": "v1"}), "slug")
            .await
            .unwrap();
        let second = store
            .upsert(Table::Topics, json!({"name": "Rust", "slug": "rust", "description": "v2"}), "slug")
            .await
            .unwrap();

        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["description"], "v2");
        assert_eq!(store.count(Table::Topics), 1);
    }

    #[tokio::test]
    async fn test_upsert_requires_conflict_key() {
        let store = MemoryStore::new();
        let result = store
            .upsert(Table::Topics, json!({"name": "Rust"}), "slug")
            .await;
        assert!(matches!(result, Err(PersistenceError::Constraint { .. })));
    }

    #[tokio::test]
    async fn test_insert_update_delete() {
        let store = MemoryStore::new();
        let rows = store
            .insert(Table::Questions, vec![json!({"question_text": "a"}), json!({"question_text": "b"})])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0]["id"], rows[1]["id"]);

        let id = Uuid::parse_str(rows[0]["id"].as_str().unwrap()).unwrap();
        store
            .update(Table::Questions, id, json!({"question_text": "a2"}))
            .await
            .unwrap();
        assert_eq!(store.rows(Table::Questions)[0]["question_text"], "a2");

        store.delete(Table::Questions, &[id]).await.unwrap();
        assert_eq!(store.count(Table::Questions), 1);

        let missing = store.update(Table::Questions, id, json!({})).await;
        assert!(matches!(missing, Err(PersistenceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_leaf_topics_walks_subtree_only() {
        let store = MemoryStore::new();
        let root = store
            .upsert(Table::Topics, json!({"name": "root", "slug": "root", "parent_id": null}), "slug")
            .await
            .unwrap();
        let other_root = store
            .upsert(Table::Topics, json!({"name": "other", "slug": "other", "parent_id": null}), "slug")
            .await
            .unwrap();

        let cat = store
            .insert(Table::Topics, vec![json!({"name": "cat", "parent_id": root["id"]})])
            .await
            .unwrap()
            .remove(0);
        store
            .insert(
                Table::Topics,
                vec![
                    json!({"name": "leaf-a", "parent_id": cat["id"]}),
                    json!({"name": "leaf-b", "parent_id": cat["id"]}),
                    json!({"name": "foreign", "parent_id": other_root["id"]}),
                ],
            )
            .await
            .unwrap();

        let root_id = Uuid::parse_str(root["id"].as_str().unwrap()).unwrap();
        let leaves = store.leaf_topics(root_id).await.unwrap();
        let names: Vec<_> = leaves.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["leaf-a", "leaf-b"]);
    }

    #[tokio::test]
    async fn test_leaf_topics_of_childless_root_is_empty() {
        let store = MemoryStore::new();
        let root = store
            .upsert(Table::Topics, json!({"name": "root", "slug": "root"}), "slug")
            .await
            .unwrap();
        let root_id = Uuid::parse_str(root["id"].as_str().unwrap()).unwrap();
        assert!(store.leaf_topics(root_id).await.unwrap().is_empty());
    }
}
