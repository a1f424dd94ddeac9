//! The subset of Slack Block Kit the notifier emits.

use serde::Serialize;

/// Incoming-webhook request body.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookMessage {
    /// Notification fallback when blocks cannot be shown.
    pub text: String,
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: Text },
    Section { text: Text },
    Context { elements: Vec<Text> },
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Text {
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Markdown { text: String },
}

impl Block {
    #[must_use]
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header {
            text: Text::Plain {
                text: text.into(),
                emoji: true,
            },
        }
    }

    #[must_use]
    pub fn section(markdown: impl Into<String>) -> Self {
        Self::Section {
            text: Text::Markdown {
                text: markdown.into(),
            },
        }
    }

    /// Single-element context line.
    #[must_use]
    pub fn context(markdown: impl Into<String>) -> Self {
        Self::Context {
            elements: vec![Text::Markdown {
                text: markdown.into(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blocks_serialize_to_block_kit_shape() {
        let blocks = vec![
            Block::header("Title"),
            Block::context("Period"),
            Block::Divider,
            Block::section("*bold*"),
        ];

        assert_eq!(
            serde_json::to_value(&blocks).unwrap(),
            json!([
                {"type": "header", "text": {"type": "plain_text", "text": "Title", "emoji": true}},
                {"type": "context", "elements": [{"type": "mrkdwn", "text": "Period"}]},
                {"type": "divider"},
                {"type": "section", "text": {"type": "mrkdwn", "text": "*bold*"}}
            ])
        );
    }

    #[test]
    fn channel_is_omitted_when_unset() {
        let message = WebhookMessage {
            text: "hi".to_string(),
            blocks: Vec::new(),
            channel: None,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("channel").is_none());
    }
}
