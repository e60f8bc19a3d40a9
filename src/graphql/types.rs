//! GraphQL object and input types

use async_graphql::{InputObject, SimpleObject, ID};

use crate::auth::models::{AuthResult, User};
use crate::common::helpers::{db_timestamp, now_timestamp};
use crate::questions::{Question, QuestionFilter, QuestionPage};

/// Public view of an account. Progression and credentials stay internal.
#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "User")]
pub struct UserObject {
    pub id: ID,
    pub email: String,
    pub email_verified: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserObject {
    fn from(user: User) -> Self {
        Self {
            id: ID(user.id),
            email: user.email,
            email_verified: user.email_verified,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct AuthPayload {
    pub user: UserObject,
    pub token: String,
    pub expires_at: String,
}

impl From<AuthResult> for AuthPayload {
    fn from(result: AuthResult) -> Self {
        Self {
            user: result.user.into(),
            token: result.token,
            expires_at: db_timestamp(result.expires_at),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Question")]
pub struct QuestionObject {
    pub id: ID,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub difficulty: String,
    pub topics: Vec<String>,
    pub test_case_count: i64,
}

impl From<Question> for QuestionObject {
    fn from(q: Question) -> Self {
        Self {
            id: ID(q.id.to_string()),
            title: q.title,
            slug: q.slug,
            description: q.description,
            difficulty: q.difficulty,
            topics: q.topics,
            test_case_count: q.test_case_count,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct GetQuestionsResponse {
    pub questions: Vec<QuestionObject>,
    pub total_count: i64,
    pub has_more: bool,
}

impl From<QuestionPage> for GetQuestionsResponse {
    fn from(page: QuestionPage) -> Self {
        let total_count = page.total_count() as i64;
        Self {
            questions: page.questions.into_iter().map(QuestionObject::from).collect(),
            total_count,
            has_more: page.has_more,
        }
    }
}

#[derive(InputObject, Debug, Clone, Default)]
#[graphql(name = "GetQuestionsRequest")]
pub struct GetQuestionsInput {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub difficulty: Option<String>,
    pub topics: Option<Vec<String>>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl From<GetQuestionsInput> for QuestionFilter {
    fn from(input: GetQuestionsInput) -> Self {
        Self {
            offset: input.offset,
            limit: input.limit,
            search: input.search,
            difficulty: input.difficulty,
            topics: input.topics.unwrap_or_default(),
            sort_by: input.sort_by,
            sort_order: input.sort_order,
        }
    }
}

/// Problems and matches have no storage yet; these shapes are what the
/// placeholder resolvers return.
#[derive(SimpleObject, Debug, Clone)]
pub struct Problem {
    pub id: ID,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub created_at: String,
}

impl Problem {
    pub fn placeholder(title: String, description: String, difficulty: String) -> Self {
        Self {
            id: ID::from("new-problem-id"),
            title,
            description,
            difficulty,
            created_at: now_timestamp(),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Match {
    pub id: ID,
    pub status: String,
    pub created_at: String,
}

impl Match {
    pub fn placeholder() -> Self {
        Self {
            id: ID::from("new-match-id"),
            status: "waiting".to_string(),
            created_at: now_timestamp(),
        }
    }
}
