//! End-to-end webhook tests against mock Omnivore and OpenAI servers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use completion::{CompletionSettings, OpenAIProvider};
use labeler::server::{build_router, AppState};
use labeler::{Config, Labeler};
use omnivore::OmnivoreClient;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    omnivore: MockServer,
    openai: MockServer,
}

impl Harness {
    async fn start() -> Self {
        Self {
            omnivore: MockServer::start().await,
            openai: MockServer::start().await,
        }
    }

    fn router(&self) -> Router {
        let config = Config {
            port: 0,
            trigger: "do".to_string(),
            default_prompt: None,
            omnivore_api_key: Some("omnivore-key".to_string()),
            omnivore_api_url: self.omnivore.uri(),
            completion: CompletionSettings::default(),
        };
        let omnivore =
            OmnivoreClient::with_url("omnivore-key", &config.omnivore_api_url).unwrap();
        let completion = OpenAIProvider::new("sk-test", CompletionSettings::default())
            .with_base_url(self.openai.uri());
        let labeler = Labeler::new(Arc::new(omnivore), Arc::new(completion), &config);
        build_router(AppState {
            config,
            labeler: Arc::new(labeler),
        })
    }

    async fn article(&self, article: Value) {
        Mock::given(method("POST"))
            .and(header("authorization", "omnivore-key"))
            .and(body_string_contains("query Article"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "article": { "article": article } }
            })))
            .mount(&self.omnivore)
            .await;
    }

    async fn completion(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": content }, "finish_reason": "stop" }],
                "usage": { "prompt_tokens": 120, "completion_tokens": 12 }
            })))
            .mount(&self.openai)
            .await;
    }

    /// Bodies of Omnivore requests whose document contains `operation`.
    async fn omnivore_requests(&self, operation: &str) -> Vec<Value> {
        self.omnivore
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice::<Value>(&request.body).unwrap())
            .filter(|body| {
                body["query"]
                    .as_str()
                    .is_some_and(|query| query.contains(operation))
            })
            .collect()
    }
}

fn webhook(labels: &[&str]) -> Request<Body> {
    let labels: Vec<Value> = labels
        .iter()
        .map(|name| json!({ "id": format!("id-{name}"), "name": name, "color": "#ffffff" }))
        .collect();
    let body = json!({
        "action": "created",
        "userId": "user-1",
        "label": { "pageId": "page-1", "labels": labels }
    });
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn article(labels: Value, highlights: Value) -> Value {
    json!({
        "id": "page-1",
        "title": "Ownership explained",
        "content": "Every value has exactly one owner.",
        "labels": labels,
        "highlights": highlights
    })
}

#[tokio::test]
async fn test_tags_flow_writes_merged_label_set() {
    let harness = Harness::start().await;
    harness
        .article(article(json!([{ "id": "l1", "name": "x" }]), json!([])))
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("query Labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "labels": { "labels": [
                { "id": "l1", "name": "x" },
                { "id": "l2", "name": "y" }
            ] } }
        })))
        .mount(&harness.omnivore)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("mutation SetLabels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "setLabels": { "labels": [] } }
        })))
        .expect(1)
        .mount(&harness.omnivore)
        .await;
    harness
        .completion(r#"{"tags":[{"name":"y","description":""}]}"#)
        .await;

    let (status, body) = send(harness.router(), webhook(&["do:tags"])).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("did:tags"));

    let requests = harness.omnivore_requests("mutation SetLabels").await;
    let input = &requests[0]["variables"]["input"];
    assert_eq!(input["pageId"], "page-1");
    let names: BTreeSet<&str> = input["labels"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|label| label["name"].as_str())
        .collect();
    assert_eq!(names, BTreeSet::from(["x", "y", "did:tags"]));

    let openai = harness.openai.received_requests().await.unwrap();
    let request: Value = serde_json::from_slice(&openai[0].body).unwrap();
    assert_eq!(request["model"], "gpt-4o-mini");
    assert_eq!(request["response_format"]["type"], "json_schema");
    let prompt = request["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("- Available labels: [\"x\",\"y\"]"));
}

#[tokio::test]
async fn test_annotation_creates_note() {
    let harness = Harness::start().await;
    let mut summary = json!({ "id": "l1", "name": "do:summary" });
    summary["description"] = json!("Summarize in one line.");
    harness.article(article(json!([summary]), json!([]))).await;
    Mock::given(method("POST"))
        .and(body_string_contains("mutation CreateHighlight"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "createHighlight": { "highlight": {
                "id": "note-new", "shortId": "note-new", "type": "NOTE", "annotation": "x"
            } } }
        })))
        .expect(1)
        .mount(&harness.omnivore)
        .await;
    harness
        .completion(r#"Values have "one" owner \ always."#)
        .await;

    let (status, body) = send(harness.router(), webhook(&["do:summary"])).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, "Created note note-new on article page-1");

    let requests = harness.omnivore_requests("mutation CreateHighlight").await;
    let input = &requests[0]["variables"]["input"];
    let id = input["id"].as_str().unwrap();
    assert_eq!(input["shortId"].as_str().unwrap(), &id[..8]);
    assert_eq!(input["articleId"], "page-1");
    assert_eq!(input["type"], "NOTE");
    assert_eq!(input["annotation"], r#"Values have "one" owner \ always."#);

    let openai = harness.openai.received_requests().await.unwrap();
    let request: Value = serde_json::from_slice(&openai[0].body).unwrap();
    assert!(request.get("response_format").is_none());
    assert!(request["messages"][0]["content"]
        .as_str()
        .unwrap()
        .starts_with("- Summarize in one line.\n- Article title: Ownership explained"));
}

#[tokio::test]
async fn test_annotation_updates_existing_note() {
    let harness = Harness::start().await;
    harness
        .article(article(
            json!([]),
            json!([{ "id": "note-1", "shortId": "note-1", "type": "NOTE", "annotation": "old" }]),
        ))
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("mutation UpdateHighlight"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "updateHighlight": { "highlight": {
                "id": "note-1", "type": "NOTE", "annotation": "new"
            } } }
        })))
        .expect(1)
        .mount(&harness.omnivore)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("mutation CreateHighlight"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&harness.omnivore)
        .await;
    harness.completion("new").await;

    let (status, body) = send(harness.router(), webhook(&["do"])).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, "Updated note note-1 on article page-1");

    let requests = harness.omnivore_requests("mutation UpdateHighlight").await;
    assert_eq!(
        requests[0]["variables"]["input"],
        json!({ "highlightId": "note-1", "annotation": "new" })
    );

    // The existing note is part of the prompt.
    let openai = harness.openai.received_requests().await.unwrap();
    let request: Value = serde_json::from_slice(&openai[0].body).unwrap();
    assert!(request["messages"][0]["content"]
        .as_str()
        .unwrap()
        .ends_with("- Existing note: old"));
}

#[tokio::test]
async fn test_empty_completion_is_success() {
    let harness = Harness::start().await;
    harness.article(article(json!([]), json!([]))).await;
    harness.completion("   ").await;

    let (status, body) = send(harness.router(), webhook(&["do:summary"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "No text generated for article page-1");
    assert!(harness
        .omnivore_requests("mutation CreateHighlight")
        .await
        .is_empty());
}

#[tokio::test]
async fn test_unmatched_labels_are_rejected_without_upstream_calls() {
    let harness = Harness::start().await;

    let (status, body) = send(harness.router(), webhook(&["reading", "did:summary"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No labels matching 'do' found");
    assert!(harness
        .omnivore
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_omnivore_failure_is_server_error() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&harness.omnivore)
        .await;

    let (status, body) = send(harness.router(), webhook(&["do:summary"])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("502"), "{body}");
    assert!(harness
        .openai
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn test_completion_failure_is_server_error() {
    let harness = Harness::start().await;
    harness.article(article(json!([]), json!([]))).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&harness.openai)
        .await;

    let (status, body) = send(harness.router(), webhook(&["do:summary"])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Incorrect API key provided"), "{body}");
}
