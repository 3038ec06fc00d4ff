use ragchat_model::{LanguageModel, Message, MockLlm, ModelError, Role};

#[tokio::test]
async fn test_scripted_replies_are_consumed_in_order() {
    let llm = MockLlm::new("mock").with_reply("first").with_reply("second");

    assert_eq!(llm.generate(&[Message::human("a")]).await.unwrap(), "first");
    assert_eq!(llm.generate(&[Message::human("b")]).await.unwrap(), "second");
    // Script exhausted: echoes the last human message.
    assert_eq!(llm.generate(&[Message::human("c")]).await.unwrap(), "c");
    assert_eq!(llm.calls().len(), 3);
}

#[tokio::test]
async fn test_scripted_failure_surfaces_as_request_error() {
    let llm = MockLlm::new("mock").with_failure("connection reset");

    let err = llm.generate(&[Message::human("q")]).await.unwrap_err();
    assert!(matches!(err, ModelError::Request { ref message, .. } if message == "connection reset"));
}

#[tokio::test]
async fn test_responder_sees_full_message_list() {
    let llm = MockLlm::from_fn("mock", |messages| {
        messages.iter().filter(|m| m.role == Role::System).count().to_string()
    });

    let reply = llm
        .generate(&[Message::system("s1"), Message::human("q"), Message::system("s2")])
        .await
        .unwrap();
    assert_eq!(reply, "2");
    assert_eq!(llm.name(), "mock");
}

#[test]
fn test_role_serializes_lowercase() {
    let json = serde_json::to_string(&Message::assistant("李白")).unwrap();
    assert_eq!(json, r#"{"role":"assistant","content":"李白"}"#);
}
