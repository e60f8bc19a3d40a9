//! Query and mutation roots

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Object, Result, Schema, ID};
use std::sync::Arc;
use tracing::debug;

use super::types::{
    AuthPayload, GetQuestionsInput, GetQuestionsResponse, Match, Problem, UserObject,
};
use crate::auth::cookies::{RequestContext, ResponseSink};
use crate::auth::models::SignupInput;
use crate::common::AppState;
use crate::questions::{QuestionFilter, QuestionsService};

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: Arc<AppState>) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

fn app_state<'a>(ctx: &Context<'a>) -> Result<&'a Arc<AppState>> {
    ctx.data::<Arc<AppState>>()
}

fn session_token<'a>(ctx: &Context<'a>) -> Option<&'a str> {
    ctx.data_opt::<RequestContext>()
        .and_then(|rc| rc.session_token.as_deref())
}

fn response_sink<'a>(ctx: &Context<'a>) -> Option<&'a ResponseSink> {
    ctx.data_opt::<RequestContext>().map(|rc| &rc.sink)
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The signed-in user, from the `auth_token` cookie.
    async fn me(&self, ctx: &Context<'_>) -> Result<UserObject> {
        let state = app_state(ctx)?;
        let user = state
            .auth
            .me(session_token(ctx))
            .await
            .map_err(|e| e.extend())?;
        Ok(user.into())
    }

    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<UserObject>> {
        let state = app_state(ctx)?;
        let users = state.auth.users().await.map_err(|e| e.extend())?;
        Ok(users.into_iter().map(UserObject::from).collect())
    }

    async fn user(&self, ctx: &Context<'_>, id: ID) -> Result<Option<UserObject>> {
        let state = app_state(ctx)?;
        let user = state.auth.user(&id).await.map_err(|e| e.extend())?;
        Ok(user.map(UserObject::from))
    }

    async fn get_questions(
        &self,
        ctx: &Context<'_>,
        input: Option<GetQuestionsInput>,
    ) -> Result<GetQuestionsResponse> {
        let state = app_state(ctx)?;
        let filter = QuestionFilter::from(input.unwrap_or_default());
        let page = QuestionsService::new(state.db.clone())
            .get_questions(&filter)
            .await
            .map_err(|e| e.extend())?;
        Ok(page.into())
    }

    async fn problems(&self) -> Vec<Problem> {
        Vec::new()
    }

    async fn problem(&self, id: ID) -> Option<Problem> {
        debug!(problem_id = %id.as_str(), "Problem lookup not implemented");
        None
    }

    async fn matches(&self) -> Vec<Match> {
        Vec::new()
    }

    #[graphql(name = "match")]
    async fn match_by_id(&self, id: ID) -> Option<Match> {
        debug!(match_id = %id.as_str(), "Match lookup not implemented");
        None
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn signup(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<AuthPayload> {
        let state = app_state(ctx)?;
        let input = SignupInput {
            email,
            password,
            first_name,
            last_name,
        };
        let result = state
            .auth
            .signup(response_sink(ctx), input)
            .await
            .map_err(|e| e.extend())?;
        Ok(result.into())
    }

    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<AuthPayload> {
        let state = app_state(ctx)?;
        let result = state
            .auth
            .login(response_sink(ctx), &email, &password)
            .await
            .map_err(|e| e.extend())?;
        Ok(result.into())
    }

    async fn logout(&self, ctx: &Context<'_>) -> Result<bool> {
        let state = app_state(ctx)?;
        Ok(state.auth.logout(response_sink(ctx), session_token(ctx)).await)
    }

    async fn create_problem(
        &self,
        title: String,
        description: String,
        difficulty: String,
    ) -> Problem {
        Problem::placeholder(title, description, difficulty)
    }

    async fn create_match(&self, problem_id: ID) -> Match {
        debug!(problem_id = %problem_id.as_str(), "Match creation not implemented, returning placeholder");
        Match::placeholder()
    }
}
