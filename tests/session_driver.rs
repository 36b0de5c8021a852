mod support;

use anyhow::anyhow;
use bono::llm::{ChatMessage, Role};
use bono::session::{FAREWELL, drive};

use support::{ScriptedBackend, ScriptedInput, agent};

#[tokio::test]
async fn prints_answers_then_farewell_at_end_of_input() {
    let backend = ScriptedBackend::new(vec![ChatMessage::assistant("Hello!")]);
    let mut agent = agent(backend, &[]);
    let mut input = ScriptedInput::new(&["hi"]);
    let mut out = Vec::new();

    drive(&mut agent, &mut input, &mut out).await.unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert_eq!(printed, format!("Hello!\n\n{FAREWELL}\n"));
}

#[tokio::test]
async fn blank_lines_do_not_reach_the_model() {
    let backend = ScriptedBackend::new(vec![ChatMessage::assistant("pong")]);
    let mut agent = agent(backend, &[]);
    let mut input = ScriptedInput::new(&["", "   ", "ping"]);
    let mut out = Vec::new();

    drive(&mut agent, &mut input, &mut out).await.unwrap();

    assert_eq!(agent.backend().requests().len(), 1);
    assert_eq!(agent.history().len(), 3);
}

#[tokio::test]
async fn backend_errors_are_printed_and_the_session_continues() {
    let backend = ScriptedBackend::with_results(vec![
        Err(anyhow!("API error 401 Unauthorized: bad key")),
        Ok(ChatMessage::assistant("recovered")),
    ]);
    let mut agent = agent(backend, &[]);
    let mut input = ScriptedInput::new(&["first", "second"]);
    let mut out = Vec::new();

    drive(&mut agent, &mut input, &mut out).await.unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Error: API error 401 Unauthorized: bad key"));
    assert!(printed.contains("recovered"));
    assert!(printed.ends_with(&format!("{FAREWELL}\n")));
    // The failed turn is forgotten, so no two user messages sit side by side.
    let roles: Vec<Role> = agent.history().messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    assert_eq!(agent.history().messages()[1].content.as_deref(), Some("second"));
}
