//! 主题层级写入 - 业务能力层
//!
//! 根节点按 slug upsert，其余节点按声明顺序逐个插入，父节点 id 取自上一层刚写入的记录。
//! 中途失败时尽力删除本次已写入的非根节点，然后把错误交给调用方。

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::infrastructure::{insert_one_as, upsert_as, Store, Table};
use crate::models::{CourseStructure, Metadata, NewTopic, Topic};

/// 根节点 upsert 使用的冲突键
pub const ROOT_CONFLICT_KEY: &str = "slug";

/// 层级写入结果
#[derive(Debug, Clone)]
pub struct HierarchyOutcome {
    /// 课程根节点
    pub root: Topic,
    /// 本次新写入的非根节点数量
    pub topics_created: usize,
    /// 本次写入的叶子主题数量
    pub leaf_topics: usize,
    /// 各叶子主题 question_strategy 之和
    pub planned_questions: u64,
}

/// 主题层级写入
pub struct HierarchyInserter<'a> {
    store: &'a dyn Store,
    write_metadata: bool,
}

impl<'a> HierarchyInserter<'a> {
    pub fn new(store: &'a dyn Store, write_metadata: bool) -> Self {
        Self {
            store,
            write_metadata,
        }
    }

    /// 写入整棵课程树，返回根节点
    pub async fn insert(&self, structure: &CourseStructure, root_name: &str) -> AppResult<HierarchyOutcome> {
        let mut root_record = NewTopic::root(root_name);
        if self.write_metadata {
            root_record.metadata = structure.analysis.as_ref().map(|analysis| {
                Metadata::from([("analysis".to_string(), json!(analysis))])
            });
        }

        let root: Topic = upsert_as(self.store, Table::Topics, &root_record, ROOT_CONFLICT_KEY).await?;
        info!("✓ 课程根节点: {} ({})", root.name, root.id);

        let mut created = Vec::with_capacity(structure.node_count());
        match self.insert_children(structure, root.id, &mut created).await {
            Ok(outcome) => Ok(HierarchyOutcome {
                root,
                topics_created: created.len(),
                leaf_topics: outcome.0,
                planned_questions: outcome.1,
            }),
            Err(e) => {
                self.cleanup(&created).await;
                Err(e)
            }
        }
    }

    /// 写入根节点以下的三层，返回 (叶子数量, 计划题量)
    async fn insert_children(
        &self,
        structure: &CourseStructure,
        root_id: Uuid,
        created: &mut Vec<Uuid>,
    ) -> AppResult<(usize, u64)> {
        let mut leaf_count = 0;
        let mut planned = 0u64;

        for (ci, category) in structure.structure.main_categories.iter().enumerate() {
            let record = NewTopic::child(&category.name, &category.description, root_id)
                .with_metadata(self.node_metadata(&category.extra, ci));
            let category_id = self.insert_node(&record, created).await?;
            debug!("分类: {}", category.name);

            for (si, subcategory) in category.subcategories.iter().enumerate() {
                let record = NewTopic::child(&subcategory.name, &subcategory.description, category_id)
                    .with_metadata(self.node_metadata(&subcategory.extra, si));
                let subcategory_id = self.insert_node(&record, created).await?;
                debug!("  子分类: {}", subcategory.name);

                for (li, leaf) in subcategory.leaf_topics.iter().enumerate() {
                    let record = NewTopic::child(&leaf.name, &leaf.description, subcategory_id)
                        .with_metadata(self.node_metadata(&leaf.extra, li));
                    self.insert_node(&record, created).await?;
                    debug!("    叶子主题: {}", leaf.name);

                    leaf_count += 1;
                    planned = planned.saturating_add(leaf.planned_questions());
                }
            }
        }

        Ok((leaf_count, planned))
    }

    async fn insert_node(&self, record: &NewTopic, created: &mut Vec<Uuid>) -> AppResult<Uuid> {
        let topic: Topic = insert_one_as(self.store, Table::Topics, record).await?;
        created.push(topic.id);
        Ok(topic.id)
    }

    /// 附加字段加上兄弟节点中的声明位置
    fn node_metadata(&self, extra: &Metadata, sort_order: usize) -> Option<Metadata> {
        if !self.write_metadata {
            return None;
        }
        let mut metadata = extra.clone();
        metadata.insert("sort_order".to_string(), json!(sort_order));
        Some(metadata)
    }

    /// 逆序删除本次已写入的节点，失败只记录告警
    async fn cleanup(&self, created: &[Uuid]) {
        if created.is_empty() {
            return;
        }
        warn!("⚠️ 层级写入中断，清理已写入的 {} 个节点", created.len());
        let ids: Vec<Uuid> = created.iter().rev().copied().collect();
        if let Err(e) = self.store.delete(Table::Topics, &ids).await {
            warn!("⚠️ 清理失败，残留 {} 个节点: {}", ids.len(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use crate::services::schema_mapper::parse_structure;

    fn structure() -> CourseStructure {
        parse_structure(
            &json!({
                "analysis": {"subject_area": "Programming"},
                "structure": {"main_categories": [
                    {"name": "C1", "description": "c1", "learning_outcomes": ["x"], "subcategories": [
                        {"name": "S1", "description": "s1", "leaf_topics": [
                            {"name": "L1", "description": "l1", "question_strategy": {"multiple_choice": 30, "true_false": 20}},
                            {"name": "L2", "description": "l2", "question_strategy": {"fill_in_blank": 50}}
                        ]}
                    ]},
                    {"name": "C2", "description": "c2", "subcategories": [
                        {"name": "S2", "description": "s2", "leaf_topics": [
                            {"name": "L3", "description": "l3"}
                        ]},
                        {"name": "S3", "description": "s3", "leaf_topics": []}
                    ]}
                ]}
            })
            .to_string(),
        )
        .unwrap()
    }

    fn find<'t>(topics: &'t [Topic], name: &str) -> &'t Topic {
        topics.iter().find(|t| t.name == name).unwrap()
    }

    #[tokio::test]
    async fn test_parent_links_and_counts() {
        let store = MemoryStore::new();
        let structure = structure();
        let outcome = HierarchyInserter::new(&store, true)
            .insert(&structure, "Python Basics")
            .await
            .unwrap();

        let topics = store.topics();
        assert_eq!(topics.len(), 1 + structure.node_count());
        assert_eq!(outcome.topics_created, 8);
        assert_eq!(outcome.leaf_topics, 3);
        assert_eq!(outcome.planned_questions, 100);

        let root = find(&topics, "Python Basics");
        assert!(root.is_root());
        assert_eq!(root.id, outcome.root.id);
        assert_eq!(
            root.metadata.as_ref().unwrap()["analysis"]["subject_area"],
            "Programming"
        );

        let c1 = find(&topics, "C1");
        let s1 = find(&topics, "S1");
        let s3 = find(&topics, "S3");
        assert_eq!(c1.parent_id, Some(root.id));
        assert_eq!(s1.parent_id, Some(c1.id));
        assert_eq!(find(&topics, "L1").parent_id, Some(s1.id));
        assert_eq!(find(&topics, "L2").parent_id, Some(s1.id));
        assert_eq!(find(&topics, "L3").parent_id, Some(find(&topics, "S2").id));
        assert_eq!(s3.parent_id, Some(find(&topics, "C2").id));

        let l2_meta = find(&topics, "L2").metadata.clone().unwrap();
        assert_eq!(l2_meta["sort_order"], 1);
        assert!(l2_meta.contains_key("question_strategy"));
    }

    #[tokio::test]
    async fn test_planned_questions_saturate_across_leaves() {
        let store = MemoryStore::new();
        let structure = parse_structure(
            &json!({
                "analysis": {"subject_area": "Math"},
                "structure": {"main_categories": [
                    {"name": "C", "subcategories": [
                        {"name": "S", "leaf_topics": [
                            {"name": "L1", "question_strategy": {"a": u64::MAX, "b": 1}},
                            {"name": "L2", "question_strategy": {"a": 5}}
                        ]}
                    ]}
                ]}
            })
            .to_string(),
        )
        .unwrap();

        let outcome = HierarchyInserter::new(&store, true)
            .insert(&structure, "Big Numbers")
            .await
            .unwrap();
        assert_eq!(outcome.leaf_topics, 2);
        assert_eq!(outcome.planned_questions, u64::MAX);
    }

    #[tokio::test]
    async fn test_without_metadata() {
        let store = MemoryStore::new();
        HierarchyInserter::new(&store, false)
            .insert(&structure(), "Python Basics")
            .await
            .unwrap();
        assert!(store.topics().iter().all(|t| t.metadata.is_none()));
    }

    #[tokio::test]
    async fn test_root_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let inserter = HierarchyInserter::new(&store, true);
        let first = inserter.insert(&structure(), "Python Basics").await.unwrap();
        let second = inserter.insert(&structure(), "Python Basics").await.unwrap();

        assert_eq!(first.root.id, second.root.id);
        let roots = store.topics().into_iter().filter(Topic::is_root).count();
        assert_eq!(roots, 1);
        // 非根节点不去重
        assert_eq!(store.topics().len(), 1 + 2 * 8);
    }
}
