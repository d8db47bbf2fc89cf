//! 存储能力 - 基础设施层
//!
//! 只暴露表级别的读写能力，不认识课程结构和题目流程。

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{PersistenceError, PersistenceResult};
use crate::models::Topic;

/// 存储中的表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Topics,
    Questions,
    Choices,
    CorrectAnswers,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Topics => "topics",
            Table::Questions => "questions",
            Table::Choices => "choices",
            Table::CorrectAnswers => "correct_answers",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 存储能力
///
/// 记录以 JSON 对象传递，写入后返回带 `id` 的完整记录。
#[async_trait]
pub trait Store: Send + Sync {
    /// 按 `conflict_key` 插入或更新一条记录
    async fn upsert(
        &self,
        table: Table,
        record: JsonValue,
        conflict_key: &str,
    ) -> PersistenceResult<JsonValue>;

    /// 批量插入，返回顺序与输入一致
    async fn insert(&self, table: Table, records: Vec<JsonValue>) -> PersistenceResult<Vec<JsonValue>>;

    /// 按 id 合并更新字段
    async fn update(&self, table: Table, id: Uuid, patch: JsonValue) -> PersistenceResult<()>;

    /// 按 id 删除
    async fn delete(&self, table: Table, ids: &[Uuid]) -> PersistenceResult<()>;

    /// 查询给定父节点的所有直接子主题
    async fn children_of(&self, parent_ids: &[Uuid]) -> PersistenceResult<Vec<Topic>>;

    /// 枚举根节点之下所有没有子节点的主题（不含根节点本身）
    ///
    /// 按层遍历，返回顺序即遍历顺序。
    async fn leaf_topics(&self, root_id: Uuid) -> PersistenceResult<Vec<Topic>> {
        let mut leaves = Vec::new();
        let mut frontier = self.children_of(&[root_id]).await?;
        let mut seen: HashSet<Uuid> = HashSet::from([root_id]);

        while !frontier.is_empty() {
            let ids: Vec<Uuid> = frontier.iter().map(|t| t.id).collect();
            let children = self.children_of(&ids).await?;
            let parents: HashSet<Uuid> = children.iter().filter_map(|t| t.parent_id).collect();

            let mut next = Vec::new();
            for topic in frontier {
                if !seen.insert(topic.id) {
                    continue;
                }
                if !parents.contains(&topic.id) {
                    leaves.push(topic);
                }
            }
            for child in children {
                if !seen.contains(&child.id) {
                    next.push(child);
                }
            }
            frontier = next;
        }

        Ok(leaves)
    }
}

// ========== 类型化辅助函数 ==========

fn to_record(table: Table, value: &impl Serialize) -> PersistenceResult<JsonValue> {
    serde_json::to_value(value).map_err(|source| PersistenceError::Decode {
        table: table.name().to_string(),
        source,
    })
}

fn from_record<T: DeserializeOwned>(table: Table, value: JsonValue) -> PersistenceResult<T> {
    serde_json::from_value(value).map_err(|source| PersistenceError::Decode {
        table: table.name().to_string(),
        source,
    })
}

/// 插入单条记录并反序列化为指定类型
pub async fn insert_one_as<T: DeserializeOwned>(
    store: &dyn Store,
    table: Table,
    record: &impl Serialize,
) -> PersistenceResult<T> {
    let row = to_record(table, record)?;
    let inserted = store
        .insert(table, vec![row])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| PersistenceError::EmptyResult {
            table: table.name().to_string(),
        })?;
    from_record(table, inserted)
}

/// 批量插入并反序列化为指定类型
pub async fn insert_many_as<T: DeserializeOwned, R: Serialize>(
    store: &dyn Store,
    table: Table,
    records: &[R],
) -> PersistenceResult<Vec<T>> {
    let rows = records
        .iter()
        .map(|r| to_record(table, r))
        .collect::<PersistenceResult<Vec<_>>>()?;
    let inserted = store.insert(table, rows).await?;
    if inserted.len() != records.len() {
        return Err(PersistenceError::Constraint {
            table: table.name().to_string(),
            message: format!("写入 {} 条但返回 {} 条", records.len(), inserted.len()),
        });
    }
    inserted.into_iter().map(|v| from_record(table, v)).collect()
}

/// upsert 单条记录并反序列化为指定类型
pub async fn upsert_as<T: DeserializeOwned>(
    store: &dyn Store,
    table: Table,
    record: &impl Serialize,
    conflict_key: &str,
) -> PersistenceResult<T> {
    let row = to_record(table, record)?;
    let upserted = store.upsert(table, row, conflict_key).await?;
    from_record(table, upserted)
}
