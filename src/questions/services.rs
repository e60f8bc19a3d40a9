use sqlx::SqlitePool;
use tracing::{debug, error};

use super::models::{Question, QuestionFilter, QuestionPage, QuestionRow};
use super::query::{build_questions_query, clamp_paging, BindValue};
use crate::common::ApiError;

pub struct QuestionsService {
    db: SqlitePool,
}

impl QuestionsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// One page of questions. A single extra row is fetched to decide
    /// `has_more` without a separate count query.
    pub async fn get_questions(&self, filter: &QuestionFilter) -> Result<QuestionPage, ApiError> {
        let (offset, limit) = clamp_paging(filter.offset, filter.limit);
        let query = build_questions_query(filter, offset, limit + 1);

        debug!(sql = %query.sql, args = ?query.args, "Executing question query");

        let mut statement = sqlx::query_as::<_, QuestionRow>(&query.sql);
        for arg in query.args {
            statement = match arg {
                BindValue::Text(value) => statement.bind(value),
                BindValue::Int(value) => statement.bind(value),
            };
        }

        let rows = statement.fetch_all(&self.db).await.map_err(|e| {
            error!(error = %e, "Failed to query questions");
            ApiError::DatabaseError(e)
        })?;

        let mut questions: Vec<Question> = rows.into_iter().map(Question::from).collect();
        let has_more = questions.len() as i64 > limit;
        questions.truncate(limit as usize);

        debug!(returned = questions.len(), has_more = has_more, "Question page built");
        Ok(QuestionPage {
            questions,
            has_more,
        })
    }
}
