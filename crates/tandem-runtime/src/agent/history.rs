//! Model replay construction and sanitization.
//!
//! The transcript is rebuilt into [`ChatMessage`]s and then sanitized so
//! the backend never sees a tool call without its result or a result
//! without its call. Both halves of an orphaned pair are dropped; text
//! blocks always survive. Sanitization is idempotent.

use std::collections::HashSet;

use tandem_core::messages::{ChatMessage, ContentBlock};
use tandem_core::model::MessageRole;
use tandem_store::row_types::MessageRow;
use tracing::warn;

/// Rebuild replay messages from stored rows, oldest first.
///
/// Rows with `content_type = "blocks"` carry serialized content blocks;
/// everything else is plain text. Rows that fail to parse are skipped
/// with a warning rather than poisoning the turn.
pub fn build_replay(rows: &[MessageRow]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let Ok(role) = row.role.parse::<MessageRole>() else {
            warn!(message_id = %row.id, role = %row.role, "unknown role in transcript, skipping");
            continue;
        };
        let blocks = if row.content_type == "blocks" {
            match serde_json::from_str::<Vec<ContentBlock>>(&row.content) {
                Ok(blocks) => blocks,
                Err(err) => {
                    warn!(message_id = %row.id, error = %err, "unparsable blocks, skipping");
                    continue;
                }
            }
        } else if row.content.is_empty() {
            continue;
        } else {
            vec![ContentBlock::Text {
                text: row.content.clone(),
            }]
        };
        messages.push(ChatMessage { role, blocks });
    }
    messages
}

/// Drop orphaned tool-call and tool-result blocks.
///
/// An assistant tool call must be answered in the run of tool messages
/// immediately following it; unanswered calls are dropped (text kept).
/// A tool result without a matching call in the immediately preceding
/// assistant message is dropped. Messages emptied by filtering vanish.
#[must_use]
pub fn sanitize(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut out: Vec<ChatMessage> = Vec::with_capacity(messages.len());
    let mut i = 0;
    while i < messages.len() {
        let msg = &messages[i];
        if msg.role == MessageRole::Assistant && msg.has_tool_calls() {
            // Result IDs available in the tool run right after this message
            let mut run_end = i + 1;
            let mut result_ids: HashSet<&str> = HashSet::new();
            while run_end < messages.len() && messages[run_end].role == MessageRole::Tool {
                result_ids.extend(messages[run_end].tool_result_ids());
                run_end += 1;
            }

            let kept_blocks: Vec<ContentBlock> = msg
                .blocks
                .iter()
                .filter(|block| match block {
                    ContentBlock::ToolCall { id, .. } => result_ids.contains(id.as_str()),
                    _ => true,
                })
                .cloned()
                .collect();
            let call_ids: HashSet<String> = kept_blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolCall { id, .. } => Some(id.clone()),
                    _ => None,
                })
                .collect();
            if !kept_blocks.is_empty() {
                out.push(ChatMessage {
                    role: MessageRole::Assistant,
                    blocks: kept_blocks,
                });
            }

            for tool_msg in &messages[i + 1..run_end] {
                let kept: Vec<ContentBlock> = tool_msg
                    .blocks
                    .iter()
                    .filter(|block| match block {
                        ContentBlock::ToolResult { tool_call_id, .. } => {
                            call_ids.contains(tool_call_id)
                        }
                        _ => true,
                    })
                    .cloned()
                    .collect();
                if !kept.is_empty() {
                    out.push(ChatMessage {
                        role: MessageRole::Tool,
                        blocks: kept,
                    });
                }
            }
            i = run_end;
        } else if msg.role == MessageRole::Tool {
            // No preceding assistant call run: every result here is orphaned
            let kept: Vec<ContentBlock> = msg
                .blocks
                .iter()
                .filter(|block| !matches!(block, ContentBlock::ToolResult { .. }))
                .cloned()
                .collect();
            if !kept.is_empty() {
                out.push(ChatMessage {
                    role: MessageRole::Tool,
                    blocks: kept,
                });
            }
            i += 1;
        } else {
            if !msg.blocks.is_empty() {
                out.push(msg.clone());
            }
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn call(id: &str) -> ContentBlock {
        ContentBlock::ToolCall {
            id: id.into(),
            name: "ls".into(),
            arguments: Map::new(),
        }
    }

    fn text(t: &str) -> ContentBlock {
        ContentBlock::Text { text: t.into() }
    }

    #[test]
    fn matched_pair_survives() {
        let messages = vec![
            ChatMessage::user_text("go"),
            ChatMessage::assistant_blocks(vec![text("running"), call("tc_1")]),
            ChatMessage::tool_result("tc_1", "ok", false),
            ChatMessage::assistant_text("done"),
        ];
        let clean = sanitize(&messages);
        assert_eq!(clean.len(), 4);
        assert!(clean[1].has_tool_calls());
        assert_eq!(clean[2].tool_result_ids(), vec!["tc_1"]);
    }

    #[test]
    fn orphan_call_dropped_text_kept() {
        let messages = vec![
            ChatMessage::assistant_blocks(vec![text("about to run"), call("tc_1")]),
            ChatMessage::assistant_text("never ran it"),
        ];
        let clean = sanitize(&messages);
        assert_eq!(clean.len(), 2);
        assert!(!clean[0].has_tool_calls());
        assert_eq!(clean[0].text(), "about to run");
    }

    #[test]
    fn orphan_call_with_only_call_vanishes() {
        let messages = vec![
            ChatMessage::user_text("go"),
            ChatMessage::assistant_blocks(vec![call("tc_1")]),
        ];
        let clean = sanitize(&messages);
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].role, MessageRole::User);
    }

    #[test]
    fn orphan_result_dropped() {
        let messages = vec![
            ChatMessage::user_text("go"),
            ChatMessage::tool_result("tc_ghost", "stale", false),
            ChatMessage::assistant_text("hi"),
        ];
        let clean = sanitize(&messages);
        assert_eq!(clean.len(), 2);
        assert!(clean.iter().all(|m| m.role != MessageRole::Tool));
    }

    #[test]
    fn result_not_matching_preceding_call_dropped() {
        let messages = vec![
            ChatMessage::assistant_blocks(vec![call("tc_1")]),
            ChatMessage::tool_result("tc_1", "ok", false),
            ChatMessage::tool_result("tc_2", "stray", false),
        ];
        let clean = sanitize(&messages);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[1].tool_result_ids(), vec!["tc_1"]);
    }

    #[test]
    fn multiple_calls_partially_answered() {
        let messages = vec![
            ChatMessage::assistant_blocks(vec![call("tc_1"), call("tc_2")]),
            ChatMessage::tool_result("tc_2", "only this one", false),
        ];
        let clean = sanitize(&messages);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].tool_call_ids(), vec!["tc_2"]);
        assert_eq!(clean[1].tool_result_ids(), vec!["tc_2"]);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let messages = vec![
            ChatMessage::user_text("go"),
            ChatMessage::assistant_blocks(vec![text("a"), call("tc_1"), call("tc_2")]),
            ChatMessage::tool_result("tc_1", "ok", false),
            ChatMessage::tool_result("tc_stale", "stray", true),
            ChatMessage::assistant_text("done"),
        ];
        let once = sanitize(&messages);
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn replay_parses_text_and_blocks() {
        let base = MessageRow {
            id: "msg_1".into(),
            session_id: "sess_1".into(),
            sequence: 0,
            role: "user".into(),
            agent_type: None,
            content: "hello".into(),
            content_type: "text".into(),
            tool_name: None,
            tool_input: None,
            tool_output: None,
            tool_status: None,
            context_snapshot: None,
            metadata: "{}".into(),
            created_at: String::new(),
        };
        let blocks_row = MessageRow {
            id: "msg_2".into(),
            role: "tool".into(),
            content: serde_json::to_string(&vec![ContentBlock::ToolResult {
                tool_call_id: "tc_1".into(),
                content: "ok".into(),
                is_error: false,
            }])
            .unwrap(),
            content_type: "blocks".into(),
            ..base.clone()
        };
        let bad_row = MessageRow {
            id: "msg_3".into(),
            content: "not json".into(),
            content_type: "blocks".into(),
            ..base.clone()
        };

        let replay = build_replay(&[base, blocks_row, bad_row]);
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].text(), "hello");
        assert_eq!(replay[1].tool_result_ids(), vec!["tc_1"]);
    }
}
