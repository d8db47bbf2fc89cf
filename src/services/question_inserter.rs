//! 题目写入 - 业务能力层
//!
//! 逐题写入 questions 表，再把该题的选项或标准答案一次性写入对应子表。
//! 遇到第一个失败即中止，已写入的题目保留。

use tracing::debug;
use uuid::Uuid;

use super::schema_mapper::{AnswerSet, MappedQuestion};
use crate::error::AppResult;
use crate::infrastructure::{insert_many_as, insert_one_as, Store, Table};
use crate::models::{Choice, CorrectAnswer, Question};

/// 题目写入
pub struct QuestionInserter<'a> {
    store: &'a dyn Store,
}

impl<'a> QuestionInserter<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// 把一批题目挂到指定叶子主题下，返回写入的题目 id
    pub async fn insert(&self, topic_id: Uuid, questions: &[MappedQuestion]) -> AppResult<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(questions.len());

        for question in questions {
            let row: Question = insert_one_as(self.store, Table::Questions, &question.to_row(topic_id)).await?;
            self.insert_answers(row.id, question).await?;
            ids.push(row.id);
        }

        debug!("主题 {} 写入 {} 道题", topic_id, ids.len());
        Ok(ids)
    }

    async fn insert_answers(&self, question_id: Uuid, question: &MappedQuestion) -> AppResult<()> {
        if question.answers.is_empty() {
            return Ok(());
        }

        match &question.answers {
            AnswerSet::Choices(_) => {
                let rows = question.choice_rows(question_id);
                let _: Vec<Choice> = insert_many_as(self.store, Table::Choices, &rows).await?;
            }
            AnswerSet::CorrectAnswers(_) => {
                let rows = question.answer_rows(question_id);
                let _: Vec<CorrectAnswer> = insert_many_as(self.store, Table::CorrectAnswers, &rows).await?;
            }
        }
        Ok(())
    }
}
