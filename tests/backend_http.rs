use bono::catalog::ToolCatalog;
use bono::llm::{ChatBackend, ChatMessage, OpenAiClient, Role};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(&format!("{}/api/v1", server.uri()), "sk-test", "test/model", Some(10))
        .unwrap()
        .with_progress(false)
}

fn history() -> Vec<ChatMessage> {
    vec![ChatMessage::system("be brief"), ChatMessage::user("hello")]
}

#[tokio::test]
async fn posts_history_and_catalog_to_chat_completions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-title", "bono"))
        .and(body_partial_json(json!({"model": "test/model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server)
        .complete(&history(), &ToolCatalog::builtin())
        .await
        .unwrap();

    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content.as_deref(), Some("hi there"));
    assert!(reply.tool_calls.is_empty());

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["messages"][1]["content"], "hello");
    let tools: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["function"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(tools, ["read_file", "write_file", "edit_file", "run_command"]);
}

#[tokio::test]
async fn decodes_tool_calls_with_object_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "a", "type": "function",
                     "function": {"name": "read_file", "arguments": "{\"path\":\"x\"}"}},
                    {"id": "b",
                     "function": {"name": "run_command", "arguments": {"command": "ls"}}}
                ]
            }}]
        })))
        .mount(&server)
        .await;

    let reply = client(&server)
        .complete(&history(), &ToolCatalog::builtin())
        .await
        .unwrap();

    assert_eq!(reply.content, None);
    assert_eq!(reply.tool_calls.len(), 2);
    assert_eq!(reply.tool_calls[0].function.name, "read_file");
    assert_eq!(reply.tool_calls[1].kind, "function");
    let args: Value = serde_json::from_str(&reply.tool_calls[1].function.arguments).unwrap();
    assert_eq!(args, json!({"command": "ls"}));
}

#[tokio::test]
async fn non_success_status_surfaces_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&history(), &ToolCatalog::builtin())
        .await
        .unwrap_err();

    let text = format!("{err:#}");
    assert!(text.contains("API error 500"), "{text}");
    assert!(text.contains("boom"), "{text}");
}

#[tokio::test]
async fn empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server)
        .complete(&history(), &ToolCatalog::builtin())
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("no choices"));
}

#[tokio::test]
async fn empty_catalog_omits_tools_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        })))
        .mount(&server)
        .await;

    client(&server)
        .complete(&history(), &ToolCatalog::default())
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("tools").is_none());
}
