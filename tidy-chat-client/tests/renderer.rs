use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, channel::mpsc, stream};
use tidy_chat_client::{
    APOLOGY, ChatMessage, ChatTransport, ConversationHandle, ConversationState, ReplyRenderer,
    ReplyStream, Role, TransportError, TurnError, TurnPhase,
};

const FINISH: &str = "d:{\"type\":\"finish\",\"finishReason\":\"stop\"}\n";

/// Replays fixed chunks and remembers every conversation it was sent.
struct ScriptedTransport {
    chunks: Vec<Result<&'static str, &'static str>>,
    sent: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedTransport {
    fn ok(chunks: &[&'static str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Ok(*c)).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ReplyStream, TransportError> {
        self.sent.lock().unwrap().push(messages.to_vec());
        let items: Vec<Result<Bytes, TransportError>> = self
            .chunks
            .iter()
            .map(|c| match c {
                Ok(text) => Ok(Bytes::from_static(text.as_bytes())),
                Err(reason) => Err(TransportError::Body(reason.to_string())),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}

struct RejectingTransport;

#[async_trait]
impl ChatTransport for RejectingTransport {
    async fn send(&self, _: &[ChatMessage]) -> Result<ReplyStream, TransportError> {
        Err(TransportError::Status {
            status: 502,
            body: "{\"error\":\"The assistant is unavailable (upstream status 401)\"}".into(),
        })
    }
}

/// Reply stream fed by the test, one chunk at a time.
struct ChannelTransport {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Result<Bytes, TransportError>>>>,
}

impl ChannelTransport {
    fn new() -> (Self, mpsc::UnboundedSender<Result<Bytes, TransportError>>) {
        let (tx, rx) = mpsc::unbounded();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl ChatTransport for ChannelTransport {
    async fn send(&self, _: &[ChatMessage]) -> Result<ReplyStream, TransportError> {
        let rx = self.rx.lock().unwrap().take().expect("one turn per channel");
        Ok(rx.boxed())
    }
}

fn reply_content(handle: &ConversationHandle, id: &str) -> String {
    handle.snapshot().message(id).unwrap().content.clone()
}

#[tokio::test]
async fn successful_turn_fills_placeholder() {
    let renderer = ReplyRenderer::new(ScriptedTransport::ok(&[
        "0:\"Yes\"\n0:\", w",
        "e\"\n0:\" do.\"\n",
        FINISH,
    ]));
    let handle = ConversationHandle::default();

    let outcome = renderer
        .run_turn(&handle, "Do you offer carpet cleaning?")
        .await
        .unwrap();

    assert_eq!(outcome.phase, TurnPhase::Done);
    assert!(outcome.finished);
    assert_eq!(outcome.content, "Yes, we do.");
    assert_eq!(renderer.phase(), TurnPhase::Done);

    let state = handle.snapshot();
    assert!(!state.is_loading());
    assert_eq!(state.messages().len(), 2);
    assert_eq!(state.messages()[0].role, Role::User);
    assert_eq!(state.messages()[0].content, "Do you offer carpet cleaning?");
    assert_eq!(state.messages()[1].id, outcome.message_id);
    assert_eq!(state.messages()[1].role, Role::Assistant);
    assert_eq!(state.messages()[1].content, "Yes, we do.");
}

#[tokio::test]
async fn sends_history_without_the_placeholder() {
    let renderer = ReplyRenderer::new(ScriptedTransport::ok(&["0:\"Sure.\"\n", FINISH]));
    let handle = ConversationHandle::new(ConversationState::with_greeting("Hi! How can we help?"));

    renderer.run_turn(&handle, "First question").await.unwrap();
    renderer.run_turn(&handle, "Second question").await.unwrap();

    let sent = renderer.transport().sent.lock().unwrap();
    assert_eq!(
        sent[1],
        vec![
            ChatMessage::assistant("Hi! How can we help?"),
            ChatMessage::user("First question"),
            ChatMessage::assistant("Sure."),
            ChatMessage::user("Second question"),
        ]
    );
}

#[tokio::test]
async fn rejected_request_shows_apology() {
    let renderer = ReplyRenderer::new(RejectingTransport);
    let handle = ConversationHandle::default();

    let outcome = renderer.run_turn(&handle, "hello?").await.unwrap();

    assert_eq!(outcome.phase, TurnPhase::Failed);
    assert_eq!(outcome.content, APOLOGY);
    assert_eq!(reply_content(&handle, &outcome.message_id), APOLOGY);
    assert!(!handle.snapshot().is_loading());
}

#[tokio::test]
async fn broken_stream_shows_apology() {
    let renderer = ReplyRenderer::new(ScriptedTransport {
        chunks: vec![Ok("0:\"Par\"\n"), Err("connection reset")],
        sent: Mutex::new(Vec::new()),
    });
    let handle = ConversationHandle::default();

    let outcome = renderer.run_turn(&handle, "hello?").await.unwrap();

    assert_eq!(outcome.phase, TurnPhase::Failed);
    assert_eq!(reply_content(&handle, &outcome.message_id), APOLOGY);
}

#[tokio::test]
async fn closed_stream_without_finish_is_still_done() {
    let renderer = ReplyRenderer::new(ScriptedTransport::ok(&["0:\"We clean \"\n0:\"windows.\""]));
    let handle = ConversationHandle::default();

    let outcome = renderer.run_turn(&handle, "Windows?").await.unwrap();

    assert_eq!(outcome.phase, TurnPhase::Done);
    assert!(!outcome.finished);
    assert_eq!(outcome.content, "We clean windows.");
    assert_eq!(reply_content(&handle, &outcome.message_id), "We clean windows.");
}

#[tokio::test]
async fn blank_input_is_rejected() {
    let renderer = ReplyRenderer::new(ScriptedTransport::ok(&[]));
    let handle = ConversationHandle::default();
    assert_eq!(
        renderer.run_turn(&handle, "   ").await,
        Err(TurnError::EmptyMessage)
    );
    assert!(handle.snapshot().messages().is_empty());
}

#[tokio::test]
async fn each_delta_is_published_before_the_next_arrives() {
    let (transport, tx) = ChannelTransport::new();
    let renderer = Arc::new(ReplyRenderer::new(transport));
    let handle = ConversationHandle::default();
    let mut updates = handle.subscribe();

    let turn = tokio::spawn({
        let renderer = renderer.clone();
        let handle = handle.clone();
        async move { renderer.run_turn(&handle, "Deep cleaning?").await }
    });

    // user message, placeholder and loading flag land in one transition
    updates.changed().await.unwrap();
    let (placeholder_id, loading) = {
        let state = updates.borrow_and_update();
        (state.messages()[1].id.clone(), state.is_loading())
    };
    assert!(loading);

    for (chunk, expected) in [
        ("0:\"Abso", None),
        ("lutely\"\n", Some("Absolutely")),
        ("0:\"!\"\n", Some("Absolutely!")),
    ] {
        tx.unbounded_send(Ok(Bytes::from_static(chunk.as_bytes()))).unwrap();
        if let Some(expected) = expected {
            updates.changed().await.unwrap();
            let state = updates.borrow_and_update();
            assert_eq!(state.message(&placeholder_id).unwrap().content, expected);
        }
    }

    tx.unbounded_send(Ok(Bytes::from_static(FINISH.as_bytes()))).unwrap();
    drop(tx);

    let outcome = turn.await.unwrap().unwrap();
    assert_eq!(outcome.content, "Absolutely!");
    assert!(outcome.finished);
}

#[tokio::test]
async fn second_turn_is_refused_while_streaming() {
    let (transport, tx) = ChannelTransport::new();
    let renderer = Arc::new(ReplyRenderer::new(transport));
    let handle = ConversationHandle::default();
    let mut updates = handle.subscribe();

    let turn = tokio::spawn({
        let renderer = renderer.clone();
        let handle = handle.clone();
        async move { renderer.run_turn(&handle, "first").await }
    });
    updates.changed().await.unwrap();

    assert_eq!(
        renderer.run_turn(&handle, "second").await,
        Err(TurnError::Busy)
    );
    assert_eq!(handle.snapshot().messages().len(), 2);

    drop(tx);
    let outcome = turn.await.unwrap().unwrap();
    assert_eq!(outcome.phase, TurnPhase::Done);
    assert_eq!(outcome.content, "");
}

#[tokio::test]
async fn cancel_keeps_partial_reply() {
    let (transport, tx) = ChannelTransport::new();
    let renderer = Arc::new(ReplyRenderer::new(transport));
    let handle = ConversationHandle::default();
    let mut updates = handle.subscribe();

    let turn = tokio::spawn({
        let renderer = renderer.clone();
        let handle = handle.clone();
        async move { renderer.run_turn(&handle, "Tell me everything").await }
    });
    updates.changed().await.unwrap();

    tx.unbounded_send(Ok(Bytes::from_static(b"0:\"We offer\"\n"))).unwrap();
    updates.changed().await.unwrap();
    assert_eq!(renderer.phase(), TurnPhase::Streaming);

    renderer.cancel();
    let outcome = turn.await.unwrap().unwrap();

    assert_eq!(outcome.phase, TurnPhase::Cancelled);
    assert_eq!(outcome.content, "We offer");
    assert_eq!(reply_content(&handle, &outcome.message_id), "We offer");
    assert!(!handle.snapshot().is_loading());
    assert_eq!(renderer.phase(), TurnPhase::Cancelled);

    // The sender outlives the turn; nothing more is read.
    assert!(tx.unbounded_send(Ok(Bytes::from_static(b"0:\"late\"\n"))).is_err());
}

#[tokio::test]
async fn one_renderer_runs_one_turn_across_conversations() {
    let (transport, tx) = ChannelTransport::new();
    let renderer = Arc::new(ReplyRenderer::new(transport));
    let first = ConversationHandle::default();
    let second = ConversationHandle::default();
    let mut updates = first.subscribe();

    let turn = tokio::spawn({
        let renderer = renderer.clone();
        let first = first.clone();
        async move { renderer.run_turn(&first, "Window cleaning?").await }
    });
    updates.changed().await.unwrap();

    assert_eq!(
        renderer.run_turn(&second, "Oven cleaning?").await,
        Err(TurnError::Busy)
    );
    let untouched = second.snapshot();
    assert!(untouched.messages().is_empty());
    assert!(!untouched.is_loading());

    tx.unbounded_send(Ok(Bytes::from_static(b"0:\"Yes\"\n"))).unwrap();
    updates.changed().await.unwrap();
    assert_eq!(renderer.phase(), TurnPhase::Streaming);

    renderer.cancel();
    let outcome = turn.await.unwrap().unwrap();
    assert_eq!(outcome.phase, TurnPhase::Cancelled);
    assert_eq!(outcome.content, "Yes");
    assert_eq!(renderer.phase(), TurnPhase::Cancelled);
}

#[tokio::test]
async fn clearing_mid_turn_keeps_the_gate_closed() {
    let (transport, tx) = ChannelTransport::new();
    let renderer = Arc::new(ReplyRenderer::new(transport));
    let handle = ConversationHandle::default();
    let mut updates = handle.subscribe();

    let turn = tokio::spawn({
        let renderer = renderer.clone();
        let handle = handle.clone();
        async move { renderer.run_turn(&handle, "Move-out cleaning?").await }
    });
    updates.changed().await.unwrap();

    handle.clear();
    assert!(handle.snapshot().is_loading());

    let other = ReplyRenderer::new(ScriptedTransport::ok(&["0:\"Hi\"\n", FINISH]));
    assert_eq!(
        renderer.run_turn(&handle, "again").await,
        Err(TurnError::Busy)
    );
    assert_eq!(other.run_turn(&handle, "again").await, Err(TurnError::Busy));
    assert!(handle.snapshot().messages().is_empty());

    tx.unbounded_send(Ok(Bytes::from_static(b"0:\"Sure\"\n"))).unwrap();
    tx.unbounded_send(Ok(Bytes::from_static(FINISH.as_bytes()))).unwrap();
    drop(tx);

    let outcome = turn.await.unwrap().unwrap();
    assert_eq!(outcome.phase, TurnPhase::Done);
    assert_eq!(outcome.content, "Sure");
    let state = handle.snapshot();
    assert!(!state.is_loading());
    assert!(state.messages().is_empty());

    let next = other.run_turn(&handle, "again").await.unwrap();
    assert_eq!(next.content, "Hi");
    assert_eq!(handle.snapshot().messages().len(), 2);
}

#[tokio::test]
async fn cancel_right_after_start_is_not_lost() {
    let (transport, _tx) = ChannelTransport::new();
    let renderer = Arc::new(ReplyRenderer::new(transport));
    let handle = ConversationHandle::default();
    let mut updates = handle.subscribe();

    let turn = tokio::spawn({
        let renderer = renderer.clone();
        let handle = handle.clone();
        async move { renderer.run_turn(&handle, "Upholstery?").await }
    });
    updates.changed().await.unwrap();
    renderer.cancel();

    let outcome = turn.await.unwrap().unwrap();
    assert_eq!(outcome.phase, TurnPhase::Cancelled);
    assert_eq!(outcome.content, "");
    assert!(!handle.snapshot().is_loading());
}
