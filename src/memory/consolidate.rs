//! Consolidation — collapsing old memories into summaries.
//!
//! Bounds long-term growth: entries older than a cutoff are grouped by
//! kind, each large-enough group is summarized through the chat-completion
//! client, and the originals are flagged `archived` (never deleted). Every
//! external failure is logged and skipped; a failure enumerating the
//! candidates aborts the whole pass without surfacing an error.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use super::store::MemoryStore;
use super::types::{MemoryEntry, MemoryKind};
use crate::completion::{ChatMessage, CompletionProvider};

/// Outcome of a consolidation pass, for host logging.
#[derive(Debug, Default, Serialize)]
pub struct ConsolidateReport {
    /// Qualifying entries found (older than the cutoff, not summaries).
    pub eligible: usize,
    /// Kind groups that met the minimum group size.
    pub groups_considered: usize,
    /// Summary entries stored.
    pub summaries_created: usize,
    /// Original entries flagged `archived`.
    pub entries_archived: usize,
}

impl MemoryStore {
    /// Consolidate a user's memories older than `days` days.
    ///
    /// No-op below the configured minimum of qualifying entries. For each
    /// kind group of at least `min_group_size` entries, the first
    /// `max_group_contents` contents are sent to `completion` with a fixed
    /// instruction; a non-empty summary is stored as a `summary` entry and
    /// every group member is patched `archived = true`.
    pub fn consolidate(
        &self,
        user_id: &str,
        days: u64,
        completion: &dyn CompletionProvider,
    ) -> ConsolidateReport {
        let mut report = ConsolidateReport::default();
        let cutoff = Utc::now() - Duration::days(days as i64);

        let candidates = match self
            .backend()
            .find_consolidation_candidates(user_id, cutoff)
        {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(user_id, error = %err, "consolidation aborted: candidate fetch failed");
                return report;
            }
        };

        report.eligible = candidates.len();
        let settings = &self.config().consolidation;
        if candidates.len() < settings.min_total {
            return report;
        }

        let mut by_kind: BTreeMap<String, Vec<&MemoryEntry>> = BTreeMap::new();
        for entry in &candidates {
            by_kind.entry(entry.kind.as_str().to_string()).or_default().push(entry);
        }

        for (kind, group) in &by_kind {
            if group.len() < settings.min_group_size {
                continue;
            }
            report.groups_considered += 1;
            self.consolidate_group(user_id, kind, group, completion, &mut report);
        }

        info!(
            user_id,
            eligible = report.eligible,
            summaries = report.summaries_created,
            archived = report.entries_archived,
            "consolidation pass finished"
        );
        report
    }

    /// [`consolidate`](Self::consolidate) with the configured default age.
    pub fn consolidate_default(
        &self,
        user_id: &str,
        completion: &dyn CompletionProvider,
    ) -> ConsolidateReport {
        self.consolidate(user_id, self.config().consolidation.age_days, completion)
    }

    fn consolidate_group(
        &self,
        user_id: &str,
        kind: &str,
        group: &[&MemoryEntry],
        completion: &dyn CompletionProvider,
        report: &mut ConsolidateReport,
    ) {
        let settings = &self.config().consolidation;
        let joined = group
            .iter()
            .take(settings.max_group_contents)
            .map(|entry| entry.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let messages = [
            ChatMessage::system(format!("Summarize these {kind} into key points:")),
            ChatMessage::user(joined),
        ];

        let summary = match completion.complete(
            &self.config().completion.model,
            &messages,
            settings.temperature,
            settings.max_tokens,
        ) {
            Ok(response) => response.content,
            Err(err) => {
                error!(user_id, kind, error = %err, "summarization failed, skipping group");
                return;
            }
        };
        if summary.is_empty() {
            return;
        }

        let metadata = json!({
            "original_type": kind,
            "count": group.len(),
        });
        if let Err(err) = self.store(user_id, &summary, MemoryKind::Summary, metadata) {
            error!(user_id, kind, error = %err, "failed to store summary, group left unarchived");
            return;
        }
        report.summaries_created += 1;

        for entry in group {
            match self.patch_metadata(entry, "archived", json!(true)) {
                Ok(()) => report.entries_archived += 1,
                Err(err) => {
                    error!(user_id, id = %entry.id, error = %err, "failed to archive entry");
                }
            }
        }
    }
}
