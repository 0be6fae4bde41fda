use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::chat::ChatSession;
use crate::error::{AnalystError, Result};
use crate::synth::Synthesizer;

/// In-memory chat sessions. Closing a session discards its transcript.
pub struct SessionRegistry {
    synth: Arc<dyn Synthesizer>,
    sessions: RwLock<HashMap<Uuid, Arc<ChatSession>>>,
}

impl SessionRegistry {
    pub fn new(synth: Arc<dyn Synthesizer>) -> Self {
        Self {
            synth,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn open(&self, player_name: &str) -> (Uuid, Arc<ChatSession>) {
        let id = Uuid::new_v4();
        let session = Arc::new(ChatSession::new(
            id.to_string(),
            player_name,
            Arc::clone(&self.synth),
        ));
        self.sessions.write().await.insert(id, Arc::clone(&session));
        tracing::info!(session_id = %id, player = player_name, "Opened chat session");
        (id, session)
    }

    pub async fn get(&self, id: &Uuid) -> Result<Arc<ChatSession>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AnalystError::SessionNotFound {
                session_id: id.to_string(),
            })
    }

    pub async fn close(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Closed chat session");
        }
        removed
    }
}

/// Session ids arrive as text from callers; anything that is not a UUID cannot name a session.
pub fn parse_session_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AnalystError::SessionNotFound {
        session_id: raw.to_string(),
    })
}
