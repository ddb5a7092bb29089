//! System prompt assembly.
//!
//! The prompt is base instructions plus rendered shared context: items
//! linked to the session, then the cross-agent activity snapshot. Content
//! is clipped per entry so one large file cannot crowd out the rest.

use tandem_store::row_types::ContextItemRow;

use crate::aggregator::ContextSnapshot;

/// Per-entry content clip, in characters.
const CLIP_CHARS: usize = 400;

fn clip(content: &str) -> String {
    if content.chars().count() <= CLIP_CHARS {
        return content.to_string();
    }
    let clipped: String = content.chars().take(CLIP_CHARS).collect();
    format!("{clipped}…")
}

fn push_items(out: &mut String, heading: &str, items: &[ContextItemRow]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {heading}\n"));
    for item in items {
        out.push_str(&format!("- {}: {}\n", item.item_key, clip(&item.content)));
    }
}

/// Build the system prompt for one model request.
#[must_use]
pub fn build_system_prompt(
    base_instructions: &str,
    linked_items: &[(ContextItemRow, f64)],
    snapshot: &ContextSnapshot,
) -> String {
    let mut out = String::from(base_instructions);

    if !linked_items.is_empty() {
        out.push_str("\n\n# Session context\n");
        for (item, score) in linked_items {
            out.push_str(&format!(
                "- [{}] {} (relevance {score:.2}): {}\n",
                item.item_type,
                item.item_key,
                clip(&item.content)
            ));
        }
    }

    let has_activity = !snapshot.code_messages.is_empty()
        || !snapshot.terminal_messages.is_empty()
        || !snapshot.recent_files.is_empty()
        || !snapshot.recent_errors.is_empty()
        || !snapshot.active_jobs.is_empty();
    if has_activity {
        out.push_str("\n\n# Cross-agent activity\n");
    }

    if !snapshot.code_messages.is_empty() {
        out.push_str("\n## Recent code agent messages\n");
        for msg in &snapshot.code_messages {
            out.push_str(&format!("- {}: {}\n", msg.role, clip(&msg.content)));
        }
    }
    if !snapshot.terminal_messages.is_empty() {
        out.push_str("\n## Recent terminal agent messages\n");
        for msg in &snapshot.terminal_messages {
            out.push_str(&format!("- {}: {}\n", msg.role, clip(&msg.content)));
        }
    }

    push_items(&mut out, "Recently accessed files", &snapshot.recent_files);
    push_items(&mut out, "Recent errors", &snapshot.recent_errors);

    if !snapshot.active_jobs.is_empty() {
        out.push_str("\n## Active jobs\n");
        for job in &snapshot.active_jobs {
            out.push_str(&format!(
                "- {} ({}, {}%)\n",
                job.job_type, job.status, job.progress_percentage
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_snapshot() -> ContextSnapshot {
        ContextSnapshot {
            code_messages: Vec::new(),
            terminal_messages: Vec::new(),
            recent_files: Vec::new(),
            recent_errors: Vec::new(),
            active_jobs: Vec::new(),
        }
    }

    fn item(item_type: &str, key: &str, content: &str) -> ContextItemRow {
        ContextItemRow {
            id: "ctx_1".into(),
            project_id: "proj_1".into(),
            item_type: item_type.into(),
            item_key: key.into(),
            content: content.into(),
            content_hash: String::new(),
            metadata: "{}".into(),
            last_accessed_at: None,
            access_count: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn empty_context_is_just_instructions() {
        let prompt = build_system_prompt("Be helpful.", &[], &empty_snapshot());
        assert_eq!(prompt, "Be helpful.");
    }

    #[test]
    fn linked_items_render_with_relevance() {
        let prompt = build_system_prompt(
            "Base.",
            &[(item("file", "/a.rs", "fn a() {}"), 0.9)],
            &empty_snapshot(),
        );
        assert!(prompt.contains("# Session context"));
        assert!(prompt.contains("/a.rs"));
        assert!(prompt.contains("0.90"));
    }

    #[test]
    fn long_content_is_clipped() {
        let long = "x".repeat(2000);
        let mut snapshot = empty_snapshot();
        snapshot.recent_files.push(item("file", "/big.rs", &long));

        let prompt = build_system_prompt("Base.", &[], &snapshot);
        assert!(prompt.len() < 1000);
        assert!(prompt.contains('…'));
    }

    #[test]
    fn active_jobs_render_status_and_progress() {
        let mut snapshot = empty_snapshot();
        snapshot.active_jobs.push(tandem_store::row_types::JobRow {
            id: "job_1".into(),
            session_id: "sess_1".into(),
            job_type: "test_run".into(),
            status: "running".into(),
            description: None,
            input: None,
            output: None,
            error_message: None,
            progress_percentage: 40,
            started_at: None,
            completed_at: None,
            created_at: String::new(),
        });

        let prompt = build_system_prompt("Base.", &[], &snapshot);
        assert!(prompt.contains("test_run (running, 40%)"));
    }
}
