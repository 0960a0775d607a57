use serde::Deserialize;
use tracing::warn;

use crate::services::ai::{AiContent, AiKind};
use crate::services::translation::strip_code_fence;

/// A document summary with verbatim passages that can be highlighted
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Summary {
    pub overview: String,
    #[serde(default)]
    pub passages: Vec<String>,
}

impl Summary {
    /// Summary for a (possibly cached) result; errors have no summary
    pub fn from_content(content: &AiContent) -> Option<Self> {
        if content.is_error || content.kind != AiKind::Summary {
            return None;
        }
        Some(parse_summary(&content.text))
    }
}

/// Parse a model reply; plain prose is kept as an overview with no passages
pub fn parse_summary(reply: &str) -> Summary {
    let body = strip_code_fence(reply.trim());

    match serde_json::from_str::<Summary>(body) {
        Ok(mut summary) => {
            summary.overview = summary.overview.trim().to_string();
            summary.passages = summary
                .passages
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            summary
        }
        Err(e) => {
            warn!("summary reply is not JSON: {}", e);
            Summary {
                overview: reply.trim().to_string(),
                passages: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overview_and_passages() {
        let reply = r#"```json
{"overview": " Transformers drop recurrence. ",
 "passages": ["The Transformer allows for significantly more parallelization.", "  "]}
```"#;
        let summary = parse_summary(reply);
        assert_eq!(summary.overview, "Transformers drop recurrence.");
        assert_eq!(
            summary.passages,
            vec!["The Transformer allows for significantly more parallelization."]
        );
    }

    #[test]
    fn test_prose_reply_becomes_overview() {
        let summary = parse_summary("The paper introduces the Transformer.");
        assert_eq!(summary.overview, "The paper introduces the Transformer.");
        assert!(summary.passages.is_empty());
    }

    #[test]
    fn test_error_content_has_no_summary() {
        let content = AiContent::error(AiKind::Summary, "Request failed");
        assert!(Summary::from_content(&content).is_none());
        let chat = AiContent::new(AiKind::Chat, "{}");
        assert!(Summary::from_content(&chat).is_none());
    }
}
