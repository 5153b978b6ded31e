//! Text rendering of tool results and update notifications
//!
//! Output is Markdown-flavoured plain text suitable for a terminal or a chat
//! channel.

use serde::Deserialize;

use crate::sources::{CommitUpdate, DiscussionUpdate, SearchResults, UpdateBatch};

/// Payload of an `update` notification as seen by the client.
///
/// Missing sections are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotice {
    /// GitHub activity.
    #[serde(default)]
    pub github: UpdateBatch,
    /// Docs site activity.
    #[serde(default)]
    pub docs: UpdateBatch,
    /// When the server took the snapshot.
    #[serde(default)]
    pub checked_at: Option<String>,
}

fn or_fallback(lines: Vec<String>, fallback: &str) -> String {
    if lines.is_empty() {
        fallback.to_string()
    } else {
        lines.join("\n")
    }
}

fn commit_line(commit: &CommitUpdate) -> String {
    format!("📄 {} by {} - {}", commit.summary(), commit.author, commit.url)
}

fn discussion_line(discussion: &DiscussionUpdate) -> String {
    format!(
        "💬 {} ({}) - {} comments - {}",
        discussion.title, discussion.category, discussion.comment_count, discussion.url
    )
}

/// Render a `searchDocs` result.
///
/// # Examples
///
/// ```
/// use docrelay::client::format;
/// use docrelay::sources::SearchResults;
///
/// let text = format::search_results(&SearchResults::default());
/// assert!(text.contains("No documentation matches found."));
/// ```
pub fn search_results(results: &SearchResults) -> String {
    let docs = results
        .docs
        .iter()
        .map(|d| format!("📄 {}: {}", d.name, d.html_url))
        .collect();
    let discussions = results
        .discussions
        .iter()
        .map(|d| format!("💬 {} ({}): {}", d.title, d.category, d.url))
        .collect();

    [
        "**Documentation Results:**".to_string(),
        or_fallback(docs, "No documentation matches found."),
        String::new(),
        "**Discussion Results:**".to_string(),
        or_fallback(discussions, "No discussion matches found."),
    ]
    .join("\n")
}

/// Render a `getLatestUpdates` result.
pub fn latest_updates(updates: &UpdateBatch) -> String {
    [
        "**Recent Documentation Updates:**".to_string(),
        or_fallback(
            updates.docs.iter().map(commit_line).collect(),
            "No recent documentation updates.",
        ),
        String::new(),
        "**Recent Discussions:**".to_string(),
        or_fallback(
            updates.discussions.iter().map(discussion_line).collect(),
            "No recent discussions.",
        ),
    ]
    .join("\n")
}

/// Render a pushed update, merging every source.
pub fn update_notification(notice: &UpdateNotice) -> String {
    let batches = [&notice.github, &notice.docs];
    let changes = batches
        .iter()
        .flat_map(|b| b.docs.iter())
        .map(commit_line)
        .collect();
    let discussions = batches
        .iter()
        .flat_map(|b| b.discussions.iter())
        .map(discussion_line)
        .collect();

    [
        "**New Documentation Updates**".to_string(),
        String::new(),
        "**Documentation Changes:**".to_string(),
        or_fallback(changes, "No new documentation changes."),
        String::new(),
        "**Recent Discussions:**".to_string(),
        or_fallback(discussions, "No new discussions."),
    ]
    .join("\n")
}
