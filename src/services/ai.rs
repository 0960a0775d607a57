use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::Settings;
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const TEMPERATURE: f32 = 0.3;
/// Document text sent along with summary and chat requests is cut to this
const MAX_CONTEXT_CHARS: usize = 24_000;

/// Which AI feature produced a piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiKind {
    Summary,
    Translation,
    Equation,
    Citation,
    Chat,
}

impl AiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiKind::Summary => "summary",
            AiKind::Translation => "translation",
            AiKind::Equation => "equation",
            AiKind::Citation => "citation",
            AiKind::Chat => "chat",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AiKind::Summary => "Summary",
            AiKind::Translation => "Translation",
            AiKind::Equation => "Equation",
            AiKind::Citation => "Citation",
            AiKind::Chat => "Chat",
        }
    }
}

/// Result of an AI request as shown to the user
///
/// Failures are carried as content with `is_error` set, so callers never
/// have to unwind an error through the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiContent {
    pub kind: AiKind,
    pub text: String,
    #[serde(default)]
    pub is_error: bool,
}

impl AiContent {
    pub fn new(kind: AiKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(kind: AiKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            text: message.into(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A request for one of the reader's AI features
#[derive(Debug, Clone)]
pub enum AiTask<'a> {
    Summary {
        document_text: &'a str,
    },
    TranslatePage {
        page_text: &'a str,
        target_lang: &'a str,
    },
    ExplainEquation {
        equation: &'a str,
        context: &'a str,
    },
    CitationLookup {
        citation: &'a str,
    },
    Chat {
        document_text: &'a str,
        history: &'a [ChatMessage],
        question: &'a str,
    },
}

impl AiTask<'_> {
    pub fn kind(&self) -> AiKind {
        match self {
            AiTask::Summary { .. } => AiKind::Summary,
            AiTask::TranslatePage { .. } => AiKind::Translation,
            AiTask::ExplainEquation { .. } => AiKind::Equation,
            AiTask::CitationLookup { .. } => AiKind::Citation,
            AiTask::Chat { .. } => AiKind::Chat,
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        match self {
            AiTask::Summary { document_text } => vec![
                ChatMessage::system(
                    "You summarize academic papers. Reply with JSON only: {\"overview\": \
                     <short overview and key contributions>, \"passages\": [<up to five \
                     key sentences copied verbatim from the paper>]}.",
                ),
                ChatMessage::user(truncate_chars(document_text, MAX_CONTEXT_CHARS)),
            ],
            AiTask::TranslatePage {
                page_text,
                target_lang,
            } => vec![
                ChatMessage::system(format!(
                    "Split the page into paragraphs and translate each into '{}'. Reply with \
                     a JSON array only: [{{\"source\": <original paragraph>, \"target\": \
                     <translation>}}]. Copy each source paragraph verbatim.",
                    target_lang
                )),
                ChatMessage::user(*page_text),
            ],
            AiTask::ExplainEquation { equation, context } => vec![
                ChatMessage::system(
                    "Explain the equation: define every symbol, then describe what it computes.",
                ),
                ChatMessage::user(format!("Equation:\n{}\n\nSurrounding text:\n{}", equation, context)),
            ],
            AiTask::CitationLookup { citation } => vec![
                ChatMessage::system(
                    "Identify the cited work. Give authors, title, venue and year, then one \
                     sentence on why it is usually cited.",
                ),
                ChatMessage::user(*citation),
            ],
            AiTask::Chat {
                document_text,
                history,
                question,
            } => {
                let mut messages = vec![ChatMessage::system(format!(
                    "Answer questions about this document.\n\n{}",
                    truncate_chars(document_text, MAX_CONTEXT_CHARS)
                ))];
                messages.extend(history.iter().cloned());
                messages.push(ChatMessage::user(*question));
                messages
            }
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Blocking client for a chat-completions compatible endpoint
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl AiClient {
    pub fn new(endpoint: &str, api_key: Option<String>, model: &str) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.api_endpoint,
            settings.api_key.clone(),
            &settings.model,
        )
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    /// Send messages and return the first choice's text
    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
        };

        let mut builder = self.http.post(self.completions_url()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Parse("response has no choices".to_string()))
    }

    /// Run a task, turning any failure into error content
    pub fn run(&self, task: &AiTask<'_>) -> AiContent {
        let kind = task.kind();
        debug!(kind = kind.as_str(), "sending AI request");

        match self.complete(&task.messages()) {
            Ok(text) => AiContent::new(kind, text.trim()),
            Err(e) => {
                error!(kind = kind.as_str(), "AI request failed: {}", e);
                AiContent::error(kind, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        let client = AiClient::new("http://localhost:8080/v1/", None, "m");
        assert_eq!(
            client.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_task_messages() {
        let task = AiTask::TranslatePage {
            page_text: "Attention is all you need.",
            target_lang: "zh",
        };
        let messages = task.messages();
        assert_eq!(task.kind(), AiKind::Translation);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("'zh'"));
        assert_eq!(messages[1], ChatMessage::user("Attention is all you need."));
    }

    #[test]
    fn test_chat_keeps_history_order() {
        let history = vec![
            ChatMessage::user("What is BLEU?"),
            ChatMessage::assistant("A translation metric."),
        ];
        let task = AiTask::Chat {
            document_text: "doc",
            history: &history,
            question: "Who proposed it?",
        };
        let messages = task.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1], history[0]);
        assert_eq!(messages[2], history[1]);
        assert_eq!(messages[3].content, "Who proposed it?");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("深度学习", 2), "深度");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "ok");
    }

    #[test]
    fn test_unreachable_endpoint_gives_error_content() {
        let client = AiClient::new("http://127.0.0.1:9", None, "m");
        let content = client.run(&AiTask::CitationLookup {
            citation: "[12] Vaswani et al., 2017",
        });
        assert!(content.is_error);
        assert_eq!(content.kind, AiKind::Citation);
    }
}
