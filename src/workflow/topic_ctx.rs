//! 叶子主题处理上下文
//!
//! 封装"我正在处理第几个叶子主题"这一信息

use std::fmt::Display;

use crate::models::Topic;

/// 叶子主题处理上下文
#[derive(Debug, Clone)]
pub struct TopicCtx<'a> {
    /// 叶子主题在本次枚举中的序号（从1开始）
    pub index: usize,

    /// 叶子主题总数（仅用于日志显示）
    pub total: usize,

    pub topic: &'a Topic,
}

impl<'a> TopicCtx<'a> {
    pub fn new(index: usize, total: usize, topic: &'a Topic) -> Self {
        Self {
            index,
            total,
            topic,
        }
    }
}

impl Display for TopicCtx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[主题 {}/{} {}]", self.index, self.total, self.topic.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_display() {
        let topic = Topic {
            id: Uuid::new_v4(),
            name: "Past Tense".to_string(),
            description: String::new(),
            parent_id: Some(Uuid::new_v4()),
            slug: None,
            metadata: None,
        };
        assert_eq!(TopicCtx::new(2, 5, &topic).to_string(), "[主题 2/5 Past Tense]");
    }
}
