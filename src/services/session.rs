use crate::services::ai::ChatMessage;
use crate::services::store::DocumentFingerprint;

/// Chat messages kept for follow-up questions (user + assistant pairs)
pub const MAX_HISTORY_MESSAGES: usize = 12;

/// State tied to the currently open document
///
/// Every `open` starts a new generation, so work started for an earlier
/// document (or an earlier open of the same file) can be told apart.
#[derive(Debug, Default)]
pub struct Session {
    generation: u64,
    fingerprint: Option<DocumentFingerprint>,
    chat_history: Vec<ChatMessage>,
}

/// Snapshot of a session taken when background work is spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    generation: u64,
    fingerprint: Option<DocumentFingerprint>,
}

impl SessionTicket {
    /// The document the work was started for
    pub fn fingerprint(&self) -> Option<&DocumentFingerprint> {
        self.fingerprint.as_ref()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, fingerprint: Option<DocumentFingerprint>) {
        self.generation += 1;
        self.fingerprint = fingerprint;
        self.chat_history.clear();
    }

    pub fn fingerprint(&self) -> Option<&DocumentFingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn ticket(&self) -> SessionTicket {
        SessionTicket {
            generation: self.generation,
            fingerprint: self.fingerprint.clone(),
        }
    }

    /// Whether `ticket` was issued for the document that is still open
    pub fn is_current(&self, ticket: &SessionTicket) -> bool {
        ticket.generation == self.generation
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    /// Remember a question and its answer, dropping the oldest turns
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.chat_history.push(ChatMessage::user(question));
        self.chat_history.push(ChatMessage::assistant(answer));

        let excess = self.chat_history.len().saturating_sub(MAX_HISTORY_MESSAGES);
        self.chat_history.drain(..excess);
    }
}
