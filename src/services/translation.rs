use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::services::ai::{AiClient, AiContent, AiKind, AiTask};

/// One paragraph of a bilingual page translation
///
/// `source` is the original paragraph as the model quoted it; it is what
/// gets highlighted on the page when the block is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationBlock {
    #[serde(default)]
    pub source: String,
    pub target: String,
}

/// Translate one page and split the reply into blocks
///
/// The raw content is kept on the result so the caller can cache it.
pub fn translate_page(
    client: &AiClient,
    page_index: usize,
    page_text: &str,
    target_lang: &str,
) -> PageTranslation {
    let content = client.run(&AiTask::TranslatePage {
        page_text,
        target_lang,
    });
    PageTranslation::new(page_index, content)
}

/// A translated page; its blocks highlight on that page, wherever the view
/// has scrolled to since
#[derive(Debug, Clone, PartialEq)]
pub struct PageTranslation {
    pub page_index: usize,
    pub content: AiContent,
    pub blocks: Vec<TranslationBlock>,
}

impl PageTranslation {
    pub fn new(page_index: usize, content: AiContent) -> Self {
        let blocks = blocks_from_content(&content);
        Self {
            page_index,
            content,
            blocks,
        }
    }

    /// Page and query to highlight when block `index` is activated
    pub fn highlight_target(&self, index: usize) -> Option<(usize, &str)> {
        let source = self.blocks.get(index)?.source.trim();
        (!source.is_empty()).then_some((self.page_index, source))
    }
}

/// Blocks for a (possibly cached) translation result
pub fn blocks_from_content(content: &AiContent) -> Vec<TranslationBlock> {
    if content.is_error || content.kind != AiKind::Translation {
        return Vec::new();
    }
    parse_blocks(&content.text)
}

/// Parse a model reply into blocks
///
/// Accepts a bare JSON array or one wrapped in a markdown code fence. A reply
/// that isn't valid JSON becomes a single block with no source text.
pub fn parse_blocks(reply: &str) -> Vec<TranslationBlock> {
    let body = strip_code_fence(reply.trim());

    match serde_json::from_str::<Vec<TranslationBlock>>(body) {
        Ok(blocks) => blocks
            .into_iter()
            .filter(|b| !b.target.trim().is_empty())
            .collect(),
        Err(e) => {
            warn!("translation reply is not a JSON block list: {}", e);
            if reply.trim().is_empty() {
                Vec::new()
            } else {
                vec![TranslationBlock {
                    source: String::new(),
                    target: reply.trim().to_string(),
                }]
            }
        }
    }
}

/// Body of a markdown code fence, or the text itself when unfenced
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") up to the first newline
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let reply = r#"[{"source": "Deep learning works.", "target": "深度学习有效。"}]"#;
        let blocks = parse_blocks(reply);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "Deep learning works.");
        assert_eq!(blocks[0].target, "深度学习有效。");
    }

    #[test]
    fn test_parse_fenced_array() {
        let reply = "```json\n[{\"source\": \"A\", \"target\": \"甲\"}, {\"source\": \"B\", \"target\": \"\"}]\n```";
        let blocks = parse_blocks(reply);
        // empty translations are dropped
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].target, "甲");
    }

    #[test]
    fn test_unparseable_reply_is_single_block() {
        let blocks = parse_blocks("Sorry, here is the translation: 你好");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].source.is_empty());
        assert!(parse_blocks("   ").is_empty());
    }

    #[test]
    fn test_error_content_has_no_blocks() {
        let content = AiContent::error(AiKind::Translation, "Request failed");
        assert!(blocks_from_content(&content).is_empty());
    }

    #[test]
    fn test_blocks_target_their_own_page() {
        let reply = r#"[{"source": "Attention is all you need.", "target": "注意力就是一切。"},
                        {"source": "  ", "target": "空"}]"#;
        let translation = PageTranslation::new(2, AiContent::new(AiKind::Translation, reply));

        assert_eq!(translation.blocks.len(), 2);
        assert_eq!(
            translation.highlight_target(0),
            Some((2, "Attention is all you need."))
        );
        // blank source has nothing to highlight
        assert_eq!(translation.highlight_target(1), None);
        assert_eq!(translation.highlight_target(5), None);
    }

    #[test]
    fn test_unreachable_endpoint_keeps_page() {
        let client = AiClient::new("http://127.0.0.1:9", None, "m");
        let translation = translate_page(&client, 4, "Some page text.", "zh");
        assert_eq!(translation.page_index, 4);
        assert!(translation.content.is_error);
        assert!(translation.blocks.is_empty());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("[]"), "[]");
    }
}
