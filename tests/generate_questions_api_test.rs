mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{app, bearer, FakeAgent, InMemoryStore};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;

async fn post_generate(app: Router, body: JsonValue, auth: Option<String>) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/generate_questions")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let res = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, json)
}

#[tokio::test]
async fn generate_requires_a_bearer_token() {
    let store = Arc::new(InMemoryStore::default());
    let (status, body) = post_generate(
        app(FakeAgent { fail_generation: false }, store.clone()),
        json!({"topic": 1, "academy": 1, "prompt": "p"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_authorization");

    let (status, _) = post_generate(
        app(FakeAgent { fail_generation: false }, store),
        json!({"topic": 1, "academy": 1, "prompt": "p"}),
        Some("Bearer not-a-token".into()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn generated_questions_are_ordered_tipped_and_persisted() {
    let store = Arc::new(InMemoryStore {
        seed_last_order: Some(7),
        ..Default::default()
    });
    let (status, body) = post_generate(
        app(FakeAgent { fail_generation: false }, store.clone()),
        json!({
            "topic": 3,
            "academy": 2,
            "prompt": "Spanish Constitution, Title I",
            "context": "Article 14. Spaniards are equal before the law.",
            "num_of_q": 5
        }),
        Some(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let questions = body.as_array().unwrap();
    assert_eq!(questions.len(), 5);
    let orders: Vec<i64> = questions.iter().map(|q| q["order"].as_i64().unwrap()).collect();
    assert_eq!(orders, vec![8, 9, 10, 11, 12]);
    for q in questions {
        assert!(q["tip"].as_str().unwrap().starts_with("because"));
        assert!(q["id"].as_i64().is_some());
        assert_eq!(q["topic"], 3);
        assert_eq!(q["academy"], 2);
        assert!(q["answer4"].is_null());
        assert_eq!(q["llm_model"], "gpt-5-2025-08-07");
    }
    assert_eq!(store.rows.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn second_request_continues_the_persisted_sequence() {
    let store = Arc::new(InMemoryStore::default());
    let body = json!({"topic": 4, "academy": 1, "prompt": "Labour law", "num_of_q": 2});

    let (_, first) = post_generate(
        app(FakeAgent { fail_generation: false }, store.clone()),
        body.clone(),
        Some(bearer()),
    )
    .await;
    let (_, second) = post_generate(
        app(FakeAgent { fail_generation: false }, store.clone()),
        body,
        Some(bearer()),
    )
    .await;

    assert_eq!(first[1]["order"], 2);
    assert_eq!(second[0]["order"], 3);
    assert_eq!(second[1]["order"], 4);
}

#[tokio::test]
async fn persist_false_leaves_the_store_untouched() {
    let store = Arc::new(InMemoryStore::default());
    let (status, body) = post_generate(
        app(FakeAgent { fail_generation: false }, store.clone()),
        json!({"topic": 1, "academy": 1, "prompt": "p", "num_of_q": 3, "persist": false}),
        Some(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert!(body[0]["id"].is_null());
    assert!(store.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn num_of_q_is_clamped_to_the_request_limit() {
    let store = Arc::new(InMemoryStore::default());
    let (status, body) = post_generate(
        app(FakeAgent { fail_generation: false }, store),
        json!({"topic": 1, "academy": 1, "prompt": "p", "num_of_q": 40}),
        Some(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn failed_workers_give_an_empty_list_not_an_error() {
    let store = Arc::new(InMemoryStore::default());
    let (status, body) = post_generate(
        app(FakeAgent { fail_generation: true }, store.clone()),
        json!({"topic": 1, "academy": 1, "prompt": "p", "num_of_q": 4}),
        Some(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert!(store.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pipeline_failure_is_a_structured_502() {
    let store = Arc::new(InMemoryStore {
        broken: true,
        ..Default::default()
    });
    let (status, body) = post_generate(
        app(FakeAgent { fail_generation: false }, store),
        json!({"topic": 1, "academy": 1, "prompt": "p"}),
        Some(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Error generating questions and feedback"));
    assert!(message.contains("store offline"));
}

#[tokio::test]
async fn invalid_payload_is_rejected() {
    let store = Arc::new(InMemoryStore::default());
    let (status, body) = post_generate(
        app(FakeAgent { fail_generation: false }, store),
        json!({"topic": 1, "academy": 1, "prompt": "p", "num_of_q": 0}),
        Some(bearer()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("num_of_q"));
}
