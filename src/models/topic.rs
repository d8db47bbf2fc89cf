//! 主题（topics 表）记录

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Metadata;

/// 已落库的主题
///
/// `parent_id` 为空表示课程根节点；没有子节点的主题是叶子主题，只有叶子主题可以挂题目。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Topic {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// 待写入的主题
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTopic {
    pub name: String,
    pub description: String,
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl NewTopic {
    /// 课程根节点，带 slug 以便 upsert
    pub fn root(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Complete course: {}", name),
            parent_id: None,
            slug: Some(slugify(name)),
            metadata: None,
        }
    }

    /// 普通子节点
    pub fn child(name: &str, description: &str, parent_id: Uuid) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parent_id: Some(parent_id),
            slug: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<Metadata>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// 由名称生成 slug：小写，非字母数字的连续字符折叠为一个 `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("Finnish B1 Grammar and Language Skills"),
            "finnish-b1-grammar-and-language-skills"
        );
        assert_eq!(slugify("  C++ / Rust: Basics!  "), "c-rust-basics");
        assert_eq!(slugify("Ääkköset"), "ääkköset");
    }

    #[test]
    fn test_root_topic_shape() {
        let root = NewTopic::root("Python Basics");
        assert_eq!(root.parent_id, None);
        assert_eq!(root.slug.as_deref(), Some("python-basics"));
        assert_eq!(root.description, "Complete course: Python Basics");

        let json = serde_json::to_value(NewTopic::child("A", "B", Uuid::nil())).unwrap();
        assert!(json.get("slug").is_none());
        assert!(json.get("metadata").is_none());
    }
}
