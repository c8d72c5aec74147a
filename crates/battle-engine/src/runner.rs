use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, instrument, warn};

use battle_core::events::{DebateEvent, EndReason};
use battle_core::ids::MessageId;
use battle_core::participant::{participants_or_default, Participant};
use battle_core::provider::{CompletionOptions, LlmProvider};
use battle_core::stream::StreamEvent;
use battle_llm::factory::ProviderFactory;

use crate::error::EngineError;
use crate::prompt::build_prompt;
use crate::sessions::DebateSession;

const DEFAULT_ROUND_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Configuration for the debate runner.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Pause between rounds.
    pub round_delay: Duration,
    pub options: CompletionOptions,
    /// Capacity of the per-run event channel.
    pub event_buffer: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            round_delay: DEFAULT_ROUND_DELAY,
            options: CompletionOptions::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Drives a debate: rounds of sequential participant turns, each streamed
/// out as `DebateEvent`s.
#[derive(Clone)]
pub struct DebateRunner {
    factory: Arc<ProviderFactory>,
    config: RunnerConfig,
}

impl DebateRunner {
    pub fn new(factory: Arc<ProviderFactory>, config: RunnerConfig) -> Self {
        Self { factory, config }
    }

    /// Run the debate on a new task and return its event stream.
    ///
    /// `on_finish` runs on that task once the last event has been sent.
    pub fn spawn<F>(&self, session: Arc<DebateSession>, on_finish: F) -> ReceiverStream<DebateEvent>
    where
        F: FnOnce(Arc<DebateSession>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let runner = self.clone();
        tokio::spawn(async move {
            runner.run(Arc::clone(&session), tx).await;
            on_finish(session);
        });
        ReceiverStream::new(rx)
    }

    /// Run the debate to completion, sending every event to `tx`.
    ///
    /// Never fails: unexpected errors and panics become a single `error`
    /// event. The session's cancellation flag is cleared on return.
    #[instrument(skip_all, fields(session_id = %session.id, max_rounds = session.max_rounds))]
    pub async fn run(&self, session: Arc<DebateSession>, tx: mpsc::Sender<DebateEvent>) {
        let mut round = 0;
        let outcome = AssertUnwindSafe(self.drive(&session, &tx, &mut round))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(EngineError::ReceiverClosed)) => {
                warn!(round, "event receiver dropped, debate abandoned");
                None
            }
            Ok(Err(e)) => {
                error!(round, error = %e, "debate failed");
                Some(format!("{}: {e}", e.kind()))
            }
            Err(panic) => {
                let msg = panic_message(&panic);
                error!(round, panic = %msg, "debate panicked");
                Some(format!("panic: {msg}"))
            }
        };

        if let Some(content) = failure {
            if tx.send(DebateEvent::error(content, round, None)).await.is_err() {
                warn!("no event receiver, error event dropped");
            }
        }

        session.clear_cancelled();
    }

    async fn drive(
        &self,
        session: &DebateSession,
        tx: &mpsc::Sender<DebateEvent>,
        round: &mut u32,
    ) -> Result<(), EngineError> {
        let max_rounds = session.max_rounds;
        let participants = participants_or_default(Some(session.participants.clone()));

        let mut adapters = Vec::with_capacity(participants.len());
        for participant in &participants {
            match self.factory.create(participant) {
                Ok(adapter) => adapters.push(adapter),
                Err(e) => {
                    warn!(participant = %participant, error = %e, "adapter construction failed");
                    let content = format!("Failed to initialize {}: {e}", participant.provider);
                    return emit(tx, DebateEvent::error(content, 0, Some(participant.provider))).await;
                }
            }
        }

        info!(participants = participants.len(), "debate started");
        let mut latest: HashMap<String, String> = HashMap::new();

        loop {
            emit(tx, DebateEvent::round_start(*round, max_rounds)).await?;

            if session.is_cancelled() {
                info!(round = *round, "debate stopped by user");
                return emit(tx, DebateEvent::debate_end(EndReason::UserStopped, *round, max_rounds)).await;
            }

            for (index, (participant, adapter)) in participants.iter().zip(&adapters).enumerate() {
                let prompt = build_prompt(&session.question, *round, index, &participants, &latest);
                let turn = Turn {
                    participant,
                    round: *round,
                    max_rounds,
                };
                let text = self.take_turn(&turn, adapter.as_ref(), &prompt, tx).await?;
                latest.insert(participant.response_key(), text);
            }

            emit(tx, DebateEvent::round_end(*round, max_rounds)).await?;

            *round += 1;
            if *round >= max_rounds {
                info!(rounds = *round, "debate completed");
                let last = max_rounds.saturating_sub(1);
                return emit(tx, DebateEvent::debate_end(EndReason::Completed, last, max_rounds)).await;
            }

            tokio::time::sleep(self.config.round_delay).await;
        }
    }

    /// Stream one participant's answer. Provider failures are reported in
    /// band as `[Error: ...]` text rather than aborting the debate.
    async fn take_turn(
        &self,
        turn: &Turn<'_>,
        adapter: &dyn LlmProvider,
        prompt: &str,
        tx: &mpsc::Sender<DebateEvent>,
    ) -> Result<String, EngineError> {
        let Turn {
            participant,
            round,
            max_rounds,
        } = *turn;
        let message_id = MessageId::new();
        emit(tx, DebateEvent::stream_start(participant, &message_id, round, max_rounds)).await?;

        let mut text = String::new();
        let mut failure = None;

        match adapter.stream(prompt, &self.config.options).await {
            Ok(mut stream) => {
                while let Some(event) = stream.next().await {
                    match event {
                        StreamEvent::Start => {}
                        StreamEvent::TextDelta { delta } => {
                            if delta.is_empty() {
                                continue;
                            }
                            text.push_str(&delta);
                            emit(
                                tx,
                                DebateEvent::stream_chunk(participant, &message_id, delta, round, max_rounds),
                            )
                            .await?;
                        }
                        StreamEvent::Done { .. } => break,
                        StreamEvent::Error { error } => {
                            failure = Some(error);
                            break;
                        }
                    }
                }
            }
            Err(e) => failure = Some(e),
        }

        if let Some(error) = failure {
            warn!(
                participant = %participant,
                round,
                kind = error.error_kind(),
                error = %error,
                "provider call failed"
            );
            text = format!("[Error: {error}]");
            emit(
                tx,
                DebateEvent::stream_chunk(participant, &message_id, text.clone(), round, max_rounds),
            )
            .await?;
        }

        emit(
            tx,
            DebateEvent::stream_end(participant, &message_id, text.clone(), round, max_rounds),
        )
        .await?;
        Ok(text)
    }
}

#[derive(Clone, Copy)]
struct Turn<'a> {
    participant: &'a Participant,
    round: u32,
    max_rounds: u32,
}

async fn emit(tx: &mpsc::Sender<DebateEvent>, event: DebateEvent) -> Result<(), EngineError> {
    tx.send(event).await.map_err(|_| EngineError::ReceiverClosed)
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::errors::GatewayError;
    use battle_core::events::EventKind;
    use battle_core::ids::SessionId;
    use battle_core::participant::ProviderKind;
    use battle_llm::mock::{MockProvider, MockResponse};

    fn gpt() -> Participant {
        Participant::new(ProviderKind::OpenAI, "gpt-4.1")
    }

    fn gemini() -> Participant {
        Participant::new(ProviderKind::Gemini, "gemini-2.5-flash")
    }

    fn claude() -> Participant {
        Participant::new(ProviderKind::Anthropic, "claude-haiku-4-5-20251001")
    }

    /// Factory serving the given mocks; any other participant fails with a
    /// missing-key error.
    fn mock_factory(entries: Vec<(Participant, Arc<MockProvider>)>) -> Arc<ProviderFactory> {
        let table: Arc<HashMap<Participant, Arc<MockProvider>>> = Arc::new(entries.into_iter().collect());
        let mut factory = ProviderFactory::empty();
        for kind in ProviderKind::ALL {
            let table = Arc::clone(&table);
            factory.register(kind, move |p| {
                let mock = table.get(p).cloned().ok_or_else(|| {
                    GatewayError::Configuration(format!("{} API key not configured", p.provider.vendor_name()))
                })?;
                Ok(mock as Arc<dyn LlmProvider>)
            });
        }
        Arc::new(factory)
    }

    fn session(question: &str, max_rounds: u32, participants: Vec<Participant>) -> Arc<DebateSession> {
        Arc::new(DebateSession::new(
            SessionId::new(),
            question.into(),
            max_rounds,
            participants,
        ))
    }

    async fn run_to_end(factory: Arc<ProviderFactory>, session: Arc<DebateSession>) -> Vec<DebateEvent> {
        DebateRunner::new(factory, RunnerConfig::default())
            .spawn(session, |_| {})
            .collect()
            .await
    }

    fn kinds(events: &[DebateEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn what_is_ai_single_round() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_chunks(&["AI is ", "software."])]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::stream_text("Artificial intelligence.")]));
        let factory = mock_factory(vec![(gpt(), openai.clone()), (gemini(), google.clone())]);

        let events = run_to_end(factory, session("What is AI?", 1, vec![gpt(), gemini()])).await;

        use EventKind::*;
        assert_eq!(
            kinds(&events),
            vec![
                RoundStart, StreamStart, StreamChunk, StreamChunk, StreamEnd, StreamStart, StreamChunk,
                StreamEnd, RoundEnd, DebateEnd
            ]
        );
        assert_eq!(events[0].content, "Round 1");
        assert_eq!(events[0].max_rounds, Some(1));
        assert_eq!(events[1].provider, Some(ProviderKind::OpenAI));
        assert_eq!(events[1].model_id.as_deref(), Some("gpt-4.1"));
        assert_eq!(events[4].content, "AI is software.");
        assert_eq!(events[5].provider, Some(ProviderKind::Gemini));
        assert_eq!(events[7].content, "Artificial intelligence.");
        assert_eq!(events[8].content, "Round 1 complete");

        let end = events.last().unwrap();
        assert_eq!(end.content, "Debate completed");
        assert_eq!(end.reason, Some(EndReason::Completed));
        assert_eq!(end.round_number, 0);

        assert_eq!(openai.prompts(), vec!["What is AI?"]);
        assert_eq!(google.prompts(), vec!["What is AI?"]);
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_reconstruct_each_message_and_rounds_nest() {
        let openai = Arc::new(MockProvider::new(vec![
            MockResponse::stream_chunks(&["a", "b", "c"]),
            MockResponse::stream_chunks(&["d", "", "e"]),
            MockResponse::stream_chunks(&["f"]),
        ]));
        let google = Arc::new(MockProvider::new(vec![
            MockResponse::stream_chunks(&["1", "2"]),
            MockResponse::stream_chunks(&["3"]),
            MockResponse::stream_chunks(&["4", "5", "6"]),
        ]));
        let factory = mock_factory(vec![(gpt(), openai), (gemini(), google)]);

        let events = run_to_end(factory, session("q", 3, vec![gpt(), gemini()])).await;

        let mut last_round = 0;
        let mut open_round: Option<u32> = None;
        let mut current: Option<(MessageId, String)> = None;
        let mut messages = 0;

        for event in &events {
            assert!(event.round_number >= last_round, "round went backwards: {event:?}");
            last_round = event.round_number;

            match event.kind {
                EventKind::RoundStart => {
                    assert!(open_round.is_none());
                    open_round = Some(event.round_number);
                }
                EventKind::RoundEnd => {
                    assert_eq!(open_round.take(), Some(event.round_number));
                }
                EventKind::StreamStart => {
                    assert!(open_round.is_some());
                    current = Some((event.message_id.clone().unwrap(), String::new()));
                }
                EventKind::StreamChunk => {
                    let (id, text) = current.as_mut().unwrap();
                    assert_eq!(event.message_id.as_ref(), Some(&*id));
                    assert!(!event.content.is_empty());
                    text.push_str(&event.content);
                }
                EventKind::StreamEnd => {
                    let (id, text) = current.take().unwrap();
                    assert_eq!(event.message_id, Some(id));
                    assert_eq!(event.content, text);
                    messages += 1;
                }
                EventKind::DebateEnd => assert_eq!(event.round_number, 2),
                EventKind::Error => panic!("unexpected error event: {event:?}"),
            }
        }

        assert_eq!(messages, 6);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn later_rounds_see_answers_from_the_same_round() {
        let openai = Arc::new(MockProvider::new(vec![
            MockResponse::stream_text("A0"),
            MockResponse::stream_text("A1"),
        ]));
        let google = Arc::new(MockProvider::new(vec![
            MockResponse::stream_text("B0"),
            MockResponse::stream_text("B1"),
        ]));
        let factory = mock_factory(vec![(gpt(), openai.clone()), (gemini(), google.clone())]);

        run_to_end(factory, session("Why?", 2, vec![gpt(), gemini()])).await;

        let openai_prompts = openai.prompts();
        assert_eq!(openai_prompts[0], "Why?");
        assert!(openai_prompts[1].starts_with("The other AI (Gemini 2.5 Flash) responded:\n\n\"B0\""));
        assert!(openai_prompts[1].ends_with("to the original question: Why?"));

        // gemini runs after gpt in round 1, so it critiques gpt's round-1 answer.
        let google_prompts = google.prompts();
        assert_eq!(google_prompts[0], "Why?");
        assert!(google_prompts[1].starts_with("The other AI (GPT-4.1) responded:\n\n\"A1\""));
    }

    #[tokio::test(start_paused = true)]
    async fn three_participants_critique_round_robin() {
        let mocks: Vec<_> = ["x", "y", "z"]
            .iter()
            .map(|t| {
                Arc::new(MockProvider::new(vec![
                    MockResponse::stream_text(&format!("{t}0")),
                    MockResponse::stream_text(&format!("{t}1")),
                ]))
            })
            .collect();
        let participants = vec![gpt(), gemini(), claude()];
        let factory = mock_factory(
            participants
                .iter()
                .cloned()
                .zip(mocks.iter().cloned())
                .collect(),
        );

        run_to_end(factory, session("q", 2, participants)).await;

        assert!(mocks[0].prompts()[1].contains("\"y0\""));
        assert!(mocks[1].prompts()[1].contains("(Claude Haiku 4.5)"));
        assert!(mocks[1].prompts()[1].contains("\"z0\""));
        assert!(mocks[2].prompts()[1].contains("(GPT-4.1)"));
        assert!(mocks[2].prompts()[1].contains("\"x1\""));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_stream_ends_immediately() {
        let openai = Arc::new(MockProvider::new(vec![]));
        let google = Arc::new(MockProvider::new(vec![]));
        let factory = mock_factory(vec![(gpt(), openai.clone()), (gemini(), google)]);

        let debate = session("q", 5, vec![gpt(), gemini()]);
        debate.cancel();
        let events = run_to_end(factory, Arc::clone(&debate)).await;

        assert_eq!(kinds(&events), vec![EventKind::RoundStart, EventKind::DebateEnd]);
        assert_eq!(events[1].reason, Some(EndReason::UserStopped));
        assert_eq!(events[1].content, "Debate stopped by user");
        assert_eq!(events[1].round_number, 0);
        assert_eq!(openai.call_count(), 0);
        assert!(!debate.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_takes_effect_at_next_round() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_text("A0")]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::stream_text("B0")]));
        let factory = mock_factory(vec![(gpt(), openai), (gemini(), google)]);
        let debate = session("q", 3, vec![gpt(), gemini()]);

        let mut stream = DebateRunner::new(factory, RunnerConfig::default()).spawn(Arc::clone(&debate), |_| {});
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            if event.kind == EventKind::RoundEnd {
                debate.cancel();
            }
            events.push(event);
        }

        let end = events.last().unwrap();
        assert_eq!(end.reason, Some(EndReason::UserStopped));
        assert_eq!(end.round_number, 1);
        assert_eq!(events.iter().filter(|e| e.kind == EventKind::StreamEnd).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_round_lets_the_round_finish() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_text("A0")]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::stream_text("B0")]));
        let factory = mock_factory(vec![(gpt(), openai.clone()), (gemini(), google.clone())]);
        let debate = session("q", 3, vec![gpt(), gemini()]);

        let mut stream = DebateRunner::new(factory, RunnerConfig::default()).spawn(Arc::clone(&debate), |_| {});
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            if event.kind == EventKind::StreamStart && event.provider == Some(ProviderKind::OpenAI) {
                debate.cancel();
            }
            events.push(event);
        }

        assert_eq!(openai.call_count(), 1);
        assert_eq!(google.call_count(), 1);
        assert_eq!(
            kinds(&events),
            vec![
                EventKind::RoundStart,
                EventKind::StreamStart,
                EventKind::StreamChunk,
                EventKind::StreamEnd,
                EventKind::StreamStart,
                EventKind::StreamChunk,
                EventKind::StreamEnd,
                EventKind::RoundEnd,
                EventKind::RoundStart,
                EventKind::DebateEnd,
            ]
        );
        assert_eq!(events[5].provider, Some(ProviderKind::Gemini));
        assert_eq!(events[6].content, "B0");

        let tail: Vec<_> = events[7..].iter().map(|e| (e.kind, e.round_number)).collect();
        assert_eq!(
            tail,
            vec![
                (EventKind::RoundEnd, 0),
                (EventKind::RoundStart, 1),
                (EventKind::DebateEnd, 1),
            ]
        );
        assert_eq!(events[9].reason, Some(EndReason::UserStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn on_finish_runs_after_last_event() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_text("A0")]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::stream_text("B0")]));
        let factory = mock_factory(vec![(gpt(), openai), (gemini(), google)]);
        let debate = session("q", 1, vec![gpt(), gemini()]);
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let events: Vec<_> = DebateRunner::new(factory, RunnerConfig::default())
            .spawn(Arc::clone(&debate), move |finished| {
                let _ = done_tx.send(finished.id.clone());
            })
            .collect()
            .await;

        assert_eq!(events.last().unwrap().reason, Some(EndReason::Completed));
        assert_eq!(done_rx.await.unwrap(), debate.id);
    }

    #[tokio::test]
    async fn init_failure_emits_single_error() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_text("unused")]));
        let factory = mock_factory(vec![(gpt(), openai.clone())]);

        let events = run_to_end(factory, session("q", 2, vec![gpt(), gemini()])).await;

        assert_eq!(events.len(), 1);
        let err = &events[0];
        assert_eq!(err.kind, EventKind::Error);
        assert_eq!(err.provider, Some(ProviderKind::Gemini));
        assert_eq!(err.content, "Failed to initialize gemini: Google API key not configured");
        assert_eq!(err.round_number, 0);
        assert_eq!(err.max_rounds, None);
        assert_eq!(openai.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_errors_become_inline_text() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_error(
            &["partial "],
            GatewayError::RateLimited { retry_after: None },
        )]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::Error(
            GatewayError::AuthenticationFailed("bad key".into()),
        )]));
        let factory = mock_factory(vec![(gpt(), openai), (gemini(), google)]);

        let events = run_to_end(factory, session("q", 1, vec![gpt(), gemini()])).await;

        let chunks: Vec<&str> = events
            .iter()
            .filter(|e| e.kind == EventKind::StreamChunk)
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(
            chunks,
            vec!["partial ", "[Error: rate limited]", "[Error: authentication failed: bad key]"]
        );

        let ends: Vec<&str> = events
            .iter()
            .filter(|e| e.kind == EventKind::StreamEnd)
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(ends, vec!["[Error: rate limited]", "[Error: authentication failed: bad key]"]);

        assert_eq!(events.last().unwrap().reason, Some(EndReason::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn panic_becomes_error_event() {
        let openai = Arc::new(MockProvider::new(vec![
            MockResponse::stream_text("fine"),
            MockResponse::Panic("adapter exploded"),
        ]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::stream_text("also fine")]));
        let factory = mock_factory(vec![(gpt(), openai), (gemini(), google)]);
        let events = run_to_end(factory, session("q", 2, vec![gpt(), gemini()])).await;

        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::Error);
        assert_eq!(last.content, "panic: adapter exploded");
        assert_eq!(last.round_number, 1);
        assert_eq!(events.iter().filter(|e| e.kind == EventKind::Error).count(), 1);
        assert!(!events.iter().any(|e| e.kind == EventKind::DebateEnd));
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_are_spaced_by_delay() {
        let openai = Arc::new(MockProvider::new(vec![
            MockResponse::stream_text("a"),
            MockResponse::stream_text("b"),
            MockResponse::stream_text("c"),
        ]));
        let google = Arc::new(MockProvider::new(vec![
            MockResponse::stream_text("1"),
            MockResponse::stream_text("2"),
            MockResponse::stream_text("3"),
        ]));
        let factory = mock_factory(vec![(gpt(), openai), (gemini(), google)]);

        let started = tokio::time::Instant::now();
        run_to_end(factory, session("q", 3, vec![gpt(), gemini()])).await;
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn dropped_receiver_stops_the_run() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_text("a")]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::stream_text("b")]));
        let factory = mock_factory(vec![(gpt(), openai.clone()), (gemini(), google)]);
        let debate = session("q", 2, vec![gpt(), gemini()]);
        debate.cancel();

        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        DebateRunner::new(factory, RunnerConfig::default())
            .run(Arc::clone(&debate), tx)
            .await;

        assert_eq!(openai.call_count(), 0);
        assert!(!debate.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn short_participant_list_uses_default_pair() {
        let openai = Arc::new(MockProvider::new(vec![MockResponse::stream_text("a")]));
        let google = Arc::new(MockProvider::new(vec![MockResponse::stream_text("b")]));
        let factory = mock_factory(vec![(gpt(), openai.clone()), (gemini(), google.clone())]);

        let events = run_to_end(factory, session("q", 1, vec![claude()])).await;

        assert_eq!(openai.call_count(), 1);
        assert_eq!(google.call_count(), 1);
        assert_eq!(events.last().unwrap().kind, EventKind::DebateEnd);
    }
}
