//! Question data models

use serde::Serialize;
use sqlx::FromRow;

use crate::common::helpers::decode_string_list;

/// Row as stored; `topics` is a JSON array of strings.
#[derive(FromRow, Debug, Clone)]
pub struct QuestionRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub difficulty: String,
    pub topics: Option<String>,
    pub test_case_count: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub difficulty: String,
    pub topics: Vec<String>,
    pub test_case_count: i64,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            difficulty: row.difficulty,
            topics: decode_string_list(row.topics.as_deref()),
            test_case_count: row.test_case_count,
        }
    }
}

/// Filters and paging for a question listing. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub difficulty: Option<String>,
    pub topics: Vec<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub has_more: bool,
}

impl QuestionPage {
    /// Number of questions in this page, not in the whole table.
    pub fn total_count(&self) -> usize {
        self.questions.len()
    }
}
