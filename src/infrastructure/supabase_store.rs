//! Supabase 存储 - 通过 PostgREST 接口读写表

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use super::store::{Store, Table};
use crate::config::Config;
use crate::error::{PersistenceError, PersistenceResult};
use crate::models::Topic;

const TOPIC_COLUMNS: &str = "id,name,description,parent_id,slug,metadata";

/// Supabase 存储
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    /// 创建新的 Supabase 存储
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    /// 发送请求并检查状态码
    async fn send(&self, table: Table, builder: RequestBuilder) -> PersistenceResult<Response> {
        let resp = self
            .authorize(builder)
            .send()
            .await
            .map_err(|source| PersistenceError::RequestFailed {
                table: table.name().to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(PersistenceError::BadResponse {
                table: table.name().to_string(),
                status,
                body,
            });
        }

        Ok(resp)
    }

    /// 发送请求并读取返回的记录数组
    async fn send_rows(&self, table: Table, builder: RequestBuilder) -> PersistenceResult<Vec<JsonValue>> {
        let resp = self.send(table, builder).await?;
        resp.json::<Vec<JsonValue>>()
            .await
            .map_err(|source| PersistenceError::RequestFailed {
                table: table.name().to_string(),
                source,
            })
    }
}

fn id_list(ids: &[Uuid]) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
}

#[async_trait]
impl Store for SupabaseStore {
    async fn upsert(
        &self,
        table: Table,
        record: JsonValue,
        conflict_key: &str,
    ) -> PersistenceResult<JsonValue> {
        debug!("upsert {} (on_conflict={})", table, conflict_key);
        let builder = self
            .client
            .post(self.url(&format!("{}?on_conflict={}", table, conflict_key)))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&record);

        self.send_rows(table, builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PersistenceError::EmptyResult {
                table: table.name().to_string(),
            })
    }

    async fn insert(&self, table: Table, records: Vec<JsonValue>) -> PersistenceResult<Vec<JsonValue>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        debug!("insert {}: {} 条", table, records.len());
        let builder = self
            .client
            .post(self.url(table.name()))
            .header("Prefer", "return=representation")
            .json(&records);

        self.send_rows(table, builder).await
    }

    async fn update(&self, table: Table, id: Uuid, patch: JsonValue) -> PersistenceResult<()> {
        debug!("update {} id={}", table, id);
        let builder = self
            .client
            .patch(self.url(&format!("{}?id=eq.{}", table, id)))
            .header("Prefer", "return=minimal")
            .json(&patch);

        self.send(table, builder).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, ids: &[Uuid]) -> PersistenceResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        debug!("delete {}: {} 条", table, ids.len());
        let builder = self
            .client
            .delete(self.url(&format!("{}?id=in.({})", table, id_list(ids))))
            .header("Prefer", "return=minimal");

        self.send(table, builder).await?;
        Ok(())
    }

    async fn children_of(&self, parent_ids: &[Uuid]) -> PersistenceResult<Vec<Topic>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let builder = self.client.get(self.url(&format!(
            "{}?select={}&parent_id=in.({})",
            Table::Topics,
            TOPIC_COLUMNS,
            id_list(parent_ids)
        )));

        self.send_rows(Table::Topics, builder)
            .await?
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|source| PersistenceError::Decode {
                    table: Table::Topics.name().to_string(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let config = Config {
            supabase_url: "https://demo.supabase.co/".to_string(),
            supabase_key: "key".to_string(),
            ..Config::default()
        };
        let store = SupabaseStore::new(&config);
        assert_eq!(store.url("topics"), "https://demo.supabase.co/rest/v1/topics");
        assert_eq!(id_list(&[Uuid::nil(), Uuid::nil()]), format!("{0},{0}", Uuid::nil()));
    }

    /// 需要真实的 Supabase 项目：cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_live_children_of() {
        let _ = tracing_subscriber::fmt::try_init();
        let config = Config::from_env();
        let store = SupabaseStore::new(&config);

        let result = store.children_of(&[Uuid::nil()]).await;
        assert!(result.is_ok(), "查询失败: {:?}", result.err());
    }
}
