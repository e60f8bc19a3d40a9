//! Tests for the GraphQL endpoint
//!
//! Requests go through the full router so cookie handling on `/query` is
//! exercised the same way a browser would see it.

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
            Request, StatusCode,
        },
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::build_app;
    use crate::common::state::test_support::test_state;
    use crate::common::AppState;

    struct Reply {
        status: StatusCode,
        cookies: Vec<String>,
        body: Value,
    }

    impl Reply {
        fn auth_cookie(&self) -> Option<&String> {
            self.cookies.iter().find(|c| c.starts_with("auth_token="))
        }

        fn error_code(&self) -> Option<&str> {
            self.body["errors"][0]["extensions"]["code"].as_str()
        }
    }

    async fn post(app: &Router, query: &str, variables: Value, cookie: Option<&str>) -> Reply {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/query")
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = builder
            .body(Body::from(
                json!({ "query": query, "variables": variables }).to_string(),
            ))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        Reply {
            status,
            cookies,
            body: serde_json::from_slice(&bytes).unwrap(),
        }
    }

    const SIGNUP: &str = r#"
        mutation ($email: String!, $password: String!) {
            signup(email: $email, password: $password, firstName: "Ada") {
                token
                expiresAt
                user { id email emailVerified firstName lastName createdAt updatedAt }
            }
        }"#;

    const LOGIN: &str = r#"
        mutation ($email: String!, $password: String!) {
            login(email: $email, password: $password) { token user { id } }
        }"#;

    async fn app() -> (Router, Arc<AppState>) {
        let state = test_state().await;
        (build_app(state.clone()), state)
    }

    fn cookie_pair(set_cookie: &str) -> &str {
        set_cookie.split(';').next().unwrap()
    }

    #[tokio::test]
    async fn test_signup_sets_exactly_one_session_cookie() {
        let (app, _) = app().await;
        let reply = post(&app, SIGNUP, json!({ "email": "a@x.com", "password": "pw1" }), None).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.get("errors").is_none(), "{}", reply.body);
        let payload = &reply.body["data"]["signup"];
        assert_eq!(payload["user"]["email"], "a@x.com");
        assert_eq!(payload["user"]["emailVerified"], false);
        assert_eq!(payload["user"]["firstName"], "Ada");
        assert!(payload["user"]["lastName"].is_null());

        let auth_cookies: Vec<_> = reply
            .cookies
            .iter()
            .filter(|c| c.starts_with("auth_token="))
            .collect();
        assert_eq!(auth_cookies.len(), 1);
        let cookie = auth_cookies[0];
        assert_eq!(
            cookie_pair(cookie),
            format!("auth_token={}", payload["token"].as_str().unwrap())
        );
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
    }

    #[tokio::test]
    async fn test_password_flow_over_http() {
        let (app, _) = app().await;
        let vars = |pw: &str| json!({ "email": "a@x.com", "password": pw });

        let first = post(&app, SIGNUP, vars("pw1"), None).await;
        assert!(first.auth_cookie().is_some());

        let conflict = post(&app, SIGNUP, vars("pw2"), None).await;
        assert_eq!(conflict.error_code(), Some("CONFLICT"));
        assert!(conflict.auth_cookie().is_none());

        let wrong = post(&app, LOGIN, vars("pw2"), None).await;
        assert_eq!(wrong.error_code(), Some("INVALID_CREDENTIALS"));
        assert_eq!(
            wrong.body["errors"][0]["message"],
            "invalid email or password"
        );

        let unknown = post(
            &app,
            LOGIN,
            json!({ "email": "nobody@x.com", "password": "pw1" }),
            None,
        )
        .await;
        assert_eq!(unknown.body["errors"][0]["message"], wrong.body["errors"][0]["message"]);

        let ok = post(&app, LOGIN, vars("pw1"), None).await;
        assert!(ok.body.get("errors").is_none());
        assert!(ok.auth_cookie().is_some());
    }

    #[tokio::test]
    async fn test_me_reads_session_cookie() {
        let (app, _) = app().await;
        let signup = post(&app, SIGNUP, json!({ "email": "a@x.com", "password": "pw1" }), None).await;
        let cookie = cookie_pair(signup.auth_cookie().unwrap()).to_string();

        let me = post(&app, "{ me { id email } }", json!({}), Some(&cookie)).await;
        assert_eq!(me.body["data"]["me"]["email"], "a@x.com");
        assert_eq!(
            me.body["data"]["me"]["id"],
            signup.body["data"]["signup"]["user"]["id"]
        );

        let anonymous = post(&app, "{ me { id } }", json!({}), None).await;
        assert_eq!(anonymous.error_code(), Some("NOT_AUTHENTICATED"));

        let forged = post(&app, "{ me { id } }", json!({}), Some("auth_token=forged")).await;
        assert_eq!(forged.error_code(), Some("NOT_AUTHENTICATED"));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie_and_session() {
        let (app, state) = app().await;
        let signup = post(&app, SIGNUP, json!({ "email": "a@x.com", "password": "pw1" }), None).await;
        let token = signup.body["data"]["signup"]["token"].as_str().unwrap().to_string();

        let logout = post(
            &app,
            "mutation { logout }",
            json!({}),
            Some(&format!("auth_token={}", token)),
        )
        .await;
        assert_eq!(logout.body["data"]["logout"], true);
        let cleared = logout.auth_cookie().unwrap();
        assert!(cleared.starts_with("auth_token=;"));
        assert!(cleared.contains("Max-Age=0"));

        assert!(state
            .auth
            .store()
            .get_session_by_token(&token)
            .await
            .unwrap()
            .is_none());

        let anonymous = post(&app, "mutation { logout }", json!({}), None).await;
        assert_eq!(anonymous.body["data"]["logout"], true);
    }

    #[tokio::test]
    async fn test_users_and_user_queries() {
        let (app, _) = app().await;
        post(&app, SIGNUP, json!({ "email": "first@x.com", "password": "pw" }), None).await;
        let second =
            post(&app, SIGNUP, json!({ "email": "second@x.com", "password": "pw" }), None).await;
        let id = second.body["data"]["signup"]["user"]["id"].as_str().unwrap().to_string();

        let users = post(&app, "{ users { email } }", json!({}), None).await;
        assert_eq!(users.body["data"]["users"][0]["email"], "second@x.com");
        assert_eq!(users.body["data"]["users"][1]["email"], "first@x.com");

        let one = post(
            &app,
            "query ($id: ID!) { user(id: $id) { email } }",
            json!({ "id": id }),
            None,
        )
        .await;
        assert_eq!(one.body["data"]["user"]["email"], "second@x.com");

        let missing = post(
            &app,
            "query ($id: ID!) { user(id: $id) { email } }",
            json!({ "id": uuid::Uuid::new_v4().to_string() }),
            None,
        )
        .await;
        assert!(missing.body["data"]["user"].is_null());
        assert!(missing.body.get("errors").is_none());

        let invalid = post(&app, r#"{ user(id: "42") { email } }"#, json!({}), None).await;
        assert_eq!(invalid.error_code(), Some("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn test_get_questions() {
        let (app, state) = app().await;
        for i in 1..=11_i64 {
            sqlx::query(
                "INSERT INTO questions (id, title, slug, difficulty, topics) VALUES (?, ?, ?, 'Easy', '[\"array\"]')",
            )
            .bind(i)
            .bind(format!("Question {}", i))
            .bind(format!("question-{}", i))
            .execute(&state.db)
            .await
            .unwrap();
        }

        let reply = post(
            &app,
            r#"query ($input: GetQuestionsRequest) {
                getQuestions(input: $input) {
                    questions { id title topics testCaseCount }
                    totalCount
                    hasMore
                }
            }"#,
            json!({ "input": { "limit": 10, "sortBy": "dangerous" } }),
            None,
        )
        .await;

        let page = &reply.body["data"]["getQuestions"];
        assert_eq!(page["questions"].as_array().unwrap().len(), 10);
        assert_eq!(page["totalCount"], 10);
        assert_eq!(page["hasMore"], true);
        assert_eq!(page["questions"][0]["id"], "1");
        assert_eq!(page["questions"][0]["topics"], json!(["array"]));
    }

    #[tokio::test]
    async fn test_placeholder_resolvers() {
        let (app, _) = app().await;

        let reads = post(
            &app,
            r#"{ problems { id } problem(id: "p1") { id } matches { id } match(id: "m1") { id } }"#,
            json!({}),
            None,
        )
        .await;
        assert_eq!(reads.body["data"]["problems"], json!([]));
        assert!(reads.body["data"]["problem"].is_null());
        assert_eq!(reads.body["data"]["matches"], json!([]));
        assert!(reads.body["data"]["match"].is_null());

        let writes = post(
            &app,
            r#"mutation {
                createProblem(title: "Two Sum", description: "d", difficulty: "Easy") { id title createdAt }
                createMatch(problemId: "p1") { id status }
            }"#,
            json!({}),
            None,
        )
        .await;
        assert_eq!(writes.body["data"]["createProblem"]["id"], "new-problem-id");
        assert_eq!(writes.body["data"]["createProblem"]["title"], "Two Sum");
        assert_eq!(writes.body["data"]["createMatch"]["id"], "new-match-id");
        assert_eq!(writes.body["data"]["createMatch"]["status"], "waiting");
    }

    #[tokio::test]
    async fn test_playground_and_health() {
        let (app, _) = app().await;

        let playground = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(playground.status(), StatusCode::OK);
        let html = to_bytes(playground.into_body(), 1 << 20).await.unwrap();
        assert!(String::from_utf8_lossy(&html).contains("/query"));

        let health = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let missing = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(missing.into_body(), 4096).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
    }
}
