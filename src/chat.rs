//! Per-session grounded conversation about one player.

use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::decode;
use crate::error::{AnalystError, Result};
use crate::models::{ChatAnswer, ChatTurn, Role, Source};
use crate::prompt::{self, Target};
use crate::synth::Synthesizer;

pub const GREETING_ID: &str = "greeting";
pub const APOLOGY_TEXT: &str = "Sorry, I couldn't get a response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

pub struct ChatSession {
    id: String,
    player_name: String,
    synth: Arc<dyn Synthesizer>,
    transcript: Mutex<Vec<ChatTurn>>,
    in_flight: AtomicBool,
    next_seq: AtomicU64,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("player_name", &self.player_name)
            .field("in_flight", &self.in_flight.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Marks a turn as in flight; closes it with an apology if dropped before completion.
struct TurnGuard<'a> {
    session: &'a ChatSession,
    completed: bool,
}

impl<'a> TurnGuard<'a> {
    fn acquire(session: &'a ChatSession) -> Result<Self> {
        session
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AnalystError::SessionBusy {
                session_id: session.id.clone(),
            })?;
        Ok(Self {
            session,
            completed: false,
        })
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(session_id = %self.session.id, "Chat turn abandoned before completion");
            self.session
                .push_turn(Role::Assistant, APOLOGY_TEXT.to_string(), None);
        }
        self.session.in_flight.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn new(id: impl Into<String>, player_name: impl Into<String>, synth: Arc<dyn Synthesizer>) -> Self {
        let player_name = player_name.into();
        let greeting = ChatTurn {
            id: GREETING_ID.to_string(),
            role: Role::Assistant,
            text: format!(
                "Ask me anything about {player_name}'s career, recent performance, or any other cricket-related questions!"
            ),
            sources: None,
            created_at: Utc::now(),
        };
        Self {
            id: id.into(),
            player_name,
            synth,
            transcript: Mutex::new(vec![greeting]),
            in_flight: AtomicBool::new(false),
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn state(&self) -> SessionState {
        if self.in_flight.load(Ordering::Acquire) {
            SessionState::AwaitingResponse
        } else {
            SessionState::Idle
        }
    }

    /// Snapshot of the transcript in submission order.
    pub fn transcript(&self) -> Vec<ChatTurn> {
        self.lock_transcript().clone()
    }

    /// Append the user's turn, ask the model, append its answer (or an apology) and return it.
    ///
    /// Rejects blank input and any submission made while another turn is in flight.
    pub async fn submit(&self, text: &str) -> Result<ChatTurn> {
        let question = text.trim();
        if question.is_empty() {
            return Err(AnalystError::Validation(
                "Chat message cannot be empty".to_string(),
            ));
        }

        let guard = TurnGuard::acquire(self)?;
        self.push_turn(Role::User, question.to_string(), None);

        let turn = match self.answer(question).await {
            Ok(answer) => {
                tracing::info!(
                    session_id = %self.id,
                    sources = answer.sources.len(),
                    "Chat answer received"
                );
                self.push_turn(Role::Assistant, answer.text, Some(answer.sources))
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, "Chat turn failed: {}", e);
                self.push_turn(Role::Assistant, APOLOGY_TEXT.to_string(), None)
            }
        };
        guard.complete();
        Ok(turn)
    }

    async fn answer(&self, question: &str) -> Result<ChatAnswer> {
        let prompt = prompt::build(Target::Chat {
            player_name: &self.player_name,
            question,
        });
        let grounded = self.synth.grounded(&prompt).await?;
        Ok(decode::decode_chat(&grounded)?)
    }

    fn push_turn(&self, role: Role, text: String, sources: Option<Vec<Source>>) -> ChatTurn {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let turn = ChatTurn {
            id: format!("{}-{seq}", role.as_str()),
            role,
            text,
            sources,
            created_at: Utc::now(),
        };
        self.lock_transcript().push(turn.clone());
        turn
    }

    fn lock_transcript(&self) -> MutexGuard<'_, Vec<ChatTurn>> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::grounding::SourceCandidate;
    use crate::models::{GroundingChunk, GroundingMetadata, WebChunk};
    use crate::prompt::Prompt;
    use crate::synth::GroundedText;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Replays canned results for grounded calls, optionally parking until released.
    pub(crate) struct ScriptedSynth {
        replies: StdMutex<Vec<Result<GroundedText>>>,
        pub(crate) prompts: StdMutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedSynth {
        pub(crate) fn new(replies: Vec<Result<GroundedText>>) -> Self {
            Self {
                replies: StdMutex::new(replies),
                prompts: StdMutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(replies: Vec<Result<GroundedText>>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(replies)
            }
        }
    }

    #[async_trait]
    impl Synthesizer for ScriptedSynth {
        async fn structured(&self, _prompt: &Prompt) -> Result<String> {
            Err(AnalystError::backend("structured calls are not scripted"))
        }

        async fn grounded(&self, prompt: &Prompt) -> Result<GroundedText> {
            self.prompts.lock().unwrap().push(prompt.instruction.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(AnalystError::backend("no more scripted replies"));
            }
            replies.remove(0)
        }
    }

    pub(crate) fn grounded(text: &str, candidates: Vec<SourceCandidate>) -> GroundedText {
        GroundedText {
            text: text.to_string(),
            metadata: Some(GroundingMetadata {
                grounding_chunks: candidates
                    .into_iter()
                    .map(|c| GroundingChunk {
                        web: Some(WebChunk {
                            uri: c.uri,
                            title: c.title,
                        }),
                    })
                    .collect(),
                web_search_queries: vec![],
            }),
        }
    }

    #[test]
    fn new_session_starts_with_greeting() {
        let session = ChatSession::new("s1", "Rohit Sharma", Arc::new(ScriptedSynth::new(vec![])));
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].id, GREETING_ID);
        assert_eq!(transcript[0].role, Role::Assistant);
        assert!(transcript[0].text.contains("Rohit Sharma's career"));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn successful_turn_appends_user_then_answer_with_sources() {
        let synth = Arc::new(ScriptedSynth::new(vec![Ok(grounded(
            "He made 264 against Sri Lanka.",
            vec![
                SourceCandidate::new("", "X"),
                SourceCandidate::new("a.com", "A"),
                SourceCandidate::new("a.com", "A"),
            ],
        ))]));
        let session = ChatSession::new("s1", "Rohit Sharma", synth.clone());

        let turn = session.submit("  Highest ODI score?  ").await.unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text, "He made 264 against Sri Lanka.");
        assert_eq!(
            turn.sources,
            Some(vec![Source {
                uri: "a.com".into(),
                title: "A".into()
            }])
        );

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].role, Role::User);
        assert_eq!(transcript[1].text, "Highest ODI score?");
        assert_eq!(transcript[2], turn);

        let prompts = synth.prompts.lock().unwrap();
        assert!(prompts[0].contains("report about Rohit Sharma"));
        assert!(prompts[0].contains("\"Highest ODI score?\""));
    }

    #[tokio::test]
    async fn failure_appends_apology() {
        let synth = Arc::new(ScriptedSynth::new(vec![Err(AnalystError::Network(
            "timed out".to_string(),
        ))]));
        let session = ChatSession::new("s1", "Rohit Sharma", synth);

        let turn = session.submit("Anything?").await.unwrap();
        assert_eq!(turn.text, APOLOGY_TEXT);
        assert_eq!(turn.sources, None);
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_touching_transcript() {
        let session = ChatSession::new("s1", "Rohit Sharma", Arc::new(ScriptedSynth::new(vec![])));
        let err = session.submit("   ").await.unwrap_err();
        assert!(matches!(err, AnalystError::Validation(_)));
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_submission_is_rejected_and_transcript_stays_ordered() {
        let gate = Arc::new(Notify::new());
        let synth = Arc::new(ScriptedSynth::gated(
            vec![
                Ok(grounded("first answer", vec![])),
                Ok(grounded("second answer", vec![])),
            ],
            Arc::clone(&gate),
        ));
        let session = Arc::new(ChatSession::new("s1", "Rohit Sharma", synth));

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.submit("first").await }
        });

        // Wait until the first turn is parked inside the synthesizer.
        while session.state() != SessionState::AwaitingResponse {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let err = session.submit("second").await.unwrap_err();
        assert!(matches!(err, AnalystError::SessionBusy { .. }));

        gate.notify_one();
        let first_turn = first.await.unwrap().unwrap();
        assert_eq!(first_turn.text, "first answer");

        gate.notify_one();
        let second_turn = session.submit("second").await.unwrap();
        assert_eq!(second_turn.text, "second answer");

        let roles_and_text: Vec<(Role, String)> = session
            .transcript()
            .into_iter()
            .skip(1)
            .map(|t| (t.role, t.text))
            .collect();
        assert_eq!(
            roles_and_text,
            vec![
                (Role::User, "first".to_string()),
                (Role::Assistant, "first answer".to_string()),
                (Role::User, "second".to_string()),
                (Role::Assistant, "second answer".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn abandoned_turn_is_closed_with_apology() {
        let gate = Arc::new(Notify::new());
        let synth = Arc::new(ScriptedSynth::gated(
            vec![Ok(grounded("never seen", vec![]))],
            gate,
        ));
        let session = ChatSession::new("s1", "Rohit Sharma", synth);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), session.submit("hello")).await;
        assert!(abandoned.is_err());
        assert_eq!(session.state(), SessionState::Idle);

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].role, Role::User);
        assert_eq!(transcript[2].text, APOLOGY_TEXT);
    }

    #[test]
    fn debug_output_names_session_and_player() {
        let session = ChatSession::new("s-42", "Rohit Sharma", Arc::new(ScriptedSynth::new(vec![])));
        let rendered = format!("{session:?}");
        assert!(rendered.contains("\"s-42\""));
        assert!(rendered.contains("Rohit Sharma"));
        assert!(rendered.contains("in_flight: false"));
    }

    #[tokio::test]
    async fn turn_ids_are_unique() {
        let synth = Arc::new(ScriptedSynth::new(vec![
            Ok(grounded("a", vec![])),
            Ok(grounded("b", vec![])),
        ]));
        let session = ChatSession::new("s1", "Rohit Sharma", synth);
        session.submit("one").await.unwrap();
        session.submit("two").await.unwrap();

        let mut ids: Vec<String> = session.transcript().into_iter().map(|t| t.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
