//! SQL for the question listing.
//!
//! Only values are bound; the two identifiers that end up in the SQL text
//! (sort column and direction) come from closed enums.

use super::models::QuestionFilter;

pub const DEFAULT_LIMIT: i64 = 25;
pub const MAX_LIMIT: i64 = 100;

const SELECT_QUESTIONS: &str =
    "SELECT id, title, slug, description, difficulty, topics, test_case_count FROM questions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Id,
    Difficulty,
}

impl SortColumn {
    /// Anything outside the allow-list falls back to `id`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("difficulty") => SortColumn::Difficulty,
            _ => SortColumn::Id,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::Difficulty => "difficulty",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("DESC") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// `(offset, limit)` after defaults and clamping.
pub fn clamp_paging(offset: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let offset = offset.unwrap_or(0).max(0);
    let limit = match limit.unwrap_or(DEFAULT_LIMIT) {
        l if l <= 0 => DEFAULT_LIMIT,
        l => l.min(MAX_LIMIT),
    };
    (offset, limit)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Text(String),
    Int(i64),
}

#[derive(Debug, Clone)]
pub struct QuestionQuery {
    pub sql: String,
    pub args: Vec<BindValue>,
}

/// Builds the listing query. `fetch` rows are requested, which callers set
/// one above the page size to learn whether another page exists.
pub fn build_questions_query(filter: &QuestionFilter, offset: i64, fetch: i64) -> QuestionQuery {
    let mut conditions: Vec<String> = Vec::new();
    let mut args = Vec::new();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        conditions.push("(title LIKE ? OR CAST(id AS TEXT) LIKE ?)".to_string());
        args.push(BindValue::Text(format!("%{}%", search)));
        args.push(BindValue::Text(format!("{}%", search)));
    }

    if let Some(difficulty) = filter.difficulty.as_deref().filter(|d| !d.is_empty()) {
        conditions.push("difficulty = ?".to_string());
        args.push(BindValue::Text(difficulty.to_string()));
    }

    if !filter.topics.is_empty() {
        let placeholders = vec!["?"; filter.topics.len()].join(", ");
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM json_each(questions.topics) WHERE json_each.value IN ({}))",
            placeholders
        ));
        args.extend(filter.topics.iter().cloned().map(BindValue::Text));
    }

    let mut sql = SELECT_QUESTIONS.to_string();
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    let column = SortColumn::parse(filter.sort_by.as_deref());
    let order = SortOrder::parse(filter.sort_order.as_deref());
    sql.push_str(&format!(" ORDER BY {} {}", column.as_sql(), order.as_sql()));
    if column != SortColumn::Id {
        sql.push_str(", id ASC");
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    args.push(BindValue::Int(fetch));
    args.push(BindValue::Int(offset));

    QuestionQuery { sql, args }
}
