use blobscope_core::{
    ImageModel, JsonModel, KeyLoadStatus, KeySet, RecentCache, ResolvePhase, TaskSnapshot,
    TaskStatus, ValueSnapshot, ViewerModel, truncate_string_safe,
};

const MAX_LISTED_KEYS: usize = 50;
const MAX_TEXT_LEN: usize = 4096;

pub fn key_status_line(status: &KeyLoadStatus) -> String {
    match status {
        KeyLoadStatus::NoCache => "No cache open".to_string(),
        KeyLoadStatus::Loading { generation } => format!("Loading keys ({})...", generation),
        KeyLoadStatus::Ready { count } => format!("{} keys loaded", count),
        KeyLoadStatus::Failed { message } => format!("Could not list keys: {}", message),
    }
}

pub fn filtered_summary(filtered: &KeySet, total: usize) -> String {
    if filtered.len() == total {
        format!("Showing all {} keys", total)
    } else {
        format!("Showing {} of {} keys", filtered.len(), total)
    }
}

pub fn key_list(filtered: &KeySet) -> String {
    if filtered.is_empty() {
        return "(no keys)".to_string();
    }

    let mut out: Vec<String> = filtered
        .iter()
        .take(MAX_LISTED_KEYS)
        .map(|key| format!("  {}", key))
        .collect();

    if filtered.len() > MAX_LISTED_KEYS {
        out.push(format!("  ... and {} more", filtered.len() - MAX_LISTED_KEYS));
    }

    out.join("\n")
}

/// Render the value pane. `None` while the pane has nothing worth printing.
pub fn value_pane(snapshot: &ValueSnapshot) -> Option<String> {
    let key = snapshot.key.as_deref()?;

    let body = match snapshot.phase {
        ResolvePhase::Idle => return None,
        ResolvePhase::Fetching => return Some(format!("Fetching {} ...", key)),
        ResolvePhase::FetchFailed => format!(
            "error: {}",
            snapshot.error.as_deref().unwrap_or("value unavailable")
        ),
        ResolvePhase::Decoded | ResolvePhase::DecodeFailed => match snapshot.model() {
            Some(model) => viewer_body(model),
            None => "(no value)".to_string(),
        },
    };

    Some(format!("[{} | {}]\n{}", key, snapshot.viewer, body))
}

fn viewer_body(model: &ViewerModel) -> String {
    match model {
        ViewerModel::Text(text) => truncate_string_safe(text, MAX_TEXT_LEN),
        ViewerModel::Json(JsonModel::Parsed(value)) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            truncate_string_safe(&pretty, MAX_TEXT_LEN)
        }
        ViewerModel::Json(JsonModel::Raw(raw)) => format!(
            "(not valid JSON, showing raw text)\n{}",
            truncate_string_safe(raw, MAX_TEXT_LEN)
        ),
        ViewerModel::Image(ImageModel::Decoded(image)) => format!(
            "image {}x{} ({} bytes RGBA)",
            image.width,
            image.height,
            image.rgba.len()
        ),
        ViewerModel::Image(ImageModel::Broken { reason }) => {
            format!("[broken image] {}", reason)
        }
    }
}

pub fn recent_list(entries: &[RecentCache]) -> String {
    if entries.is_empty() {
        return "(no recent caches)".to_string();
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let opened = chrono::DateTime::from_timestamp(entry.last_opened, 0)
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "?".to_string());
            format!(
                "{:>3}. {} ({:?}, {})",
                index + 1,
                entry.path.display(),
                entry.layout,
                opened
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn task_list(tasks: &[TaskSnapshot]) -> String {
    tasks
        .iter()
        .map(|task| {
            let status = match &task.status {
                TaskStatus::Running => "running".to_string(),
                TaskStatus::Completed => "done".to_string(),
                TaskStatus::Failed(error) => format!("failed: {}", error),
                TaskStatus::Cancelled => "cancelled".to_string(),
            };
            format!(
                "  [{}] {} ({}, {:.2}s)",
                task.kind.label(),
                task.description,
                status,
                task.elapsed_secs
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobscope_core::{CacheLayout, Generation, TaskKind, ViewerKind, decode};
    use blobscope_test_support::fixtures::{key_set, png_bytes};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn snapshot(key: &str, viewer: ViewerKind, phase: ResolvePhase) -> ValueSnapshot {
        ValueSnapshot {
            generation: Generation::default(),
            key: Some(key.to_string()),
            viewer,
            phase,
            model: None,
            error: None,
        }
    }

    #[test]
    fn key_list_is_capped() {
        let keys = key_set((0..60).map(|i| format!("k{i:02}")));
        let listed = key_list(&keys);

        assert!(listed.starts_with("  k00\n"));
        assert!(listed.contains("  k49"));
        assert!(!listed.contains("k50"));
        assert!(listed.ends_with("... and 10 more"));
        assert_eq!(key_list(&KeySet::empty()), "(no keys)");
    }

    #[test]
    fn summary_mentions_hidden_keys() {
        let all = key_set(["a", "b"]);
        assert_eq!(filtered_summary(&all, 2), "Showing all 2 keys");
        assert_eq!(filtered_summary(&key_set(["a"]), 2), "Showing 1 of 2 keys");
    }

    #[test]
    fn idle_value_prints_nothing() {
        let mut idle = snapshot("a", ViewerKind::Text, ResolvePhase::Idle);
        assert_eq!(value_pane(&idle), None);

        idle.key = None;
        assert_eq!(value_pane(&idle), None);
    }

    #[test]
    fn json_values_are_pretty_printed() {
        let mut value = snapshot("doc", ViewerKind::Json, ResolvePhase::Decoded);
        value.model = Some(Arc::new(decode(ViewerKind::Json, br#"{"x":1}"#)));

        assert_eq!(
            value_pane(&value).as_deref(),
            Some("[doc | Json]\n{\n  \"x\": 1\n}")
        );
    }

    #[test]
    fn fallbacks_are_labelled() {
        let mut raw = snapshot("doc", ViewerKind::Json, ResolvePhase::DecodeFailed);
        raw.model = Some(Arc::new(decode(ViewerKind::Json, b"nope")));
        let rendered = value_pane(&raw).unwrap_or_default();
        assert!(rendered.contains("not valid JSON"));
        assert!(rendered.ends_with("nope"));

        let mut broken = snapshot("img", ViewerKind::Image, ResolvePhase::DecodeFailed);
        broken.model = Some(Arc::new(decode(ViewerKind::Image, b"nope")));
        assert!(value_pane(&broken).unwrap_or_default().contains("[broken image]"));
    }

    #[test]
    fn decoded_images_show_dimensions() {
        let mut value = snapshot("img", ViewerKind::Image, ResolvePhase::Decoded);
        value.model = Some(Arc::new(decode(ViewerKind::Image, &png_bytes(3, 2, [1, 2, 3, 255]))));

        assert_eq!(
            value_pane(&value).as_deref(),
            Some("[img | Image]\nimage 3x2 (24 bytes RGBA)")
        );
    }

    #[test]
    fn fetch_failures_show_the_error() {
        let mut failed = snapshot("gone", ViewerKind::Text, ResolvePhase::FetchFailed);
        failed.error = Some("Key not found: gone".to_string());

        assert_eq!(
            value_pane(&failed).as_deref(),
            Some("[gone | Text]\nerror: Key not found: gone")
        );
    }

    #[test]
    fn recent_entries_are_numbered() {
        let entries = vec![RecentCache {
            path: PathBuf::from("/tmp/blobs.db"),
            layout: CacheLayout::DatabaseFile,
            last_opened: 0,
        }];

        assert_eq!(
            recent_list(&entries),
            "  1. /tmp/blobs.db (DatabaseFile, 1970-01-01 00:00)"
        );
        assert_eq!(recent_list(&[]), "(no recent caches)");
    }

    #[test]
    fn tasks_show_kind_and_outcome() {
        let task = |status| TaskSnapshot {
            id: blobscope_core::TaskId::nil(),
            kind: TaskKind::KeyGet,
            description: "GET alpha".to_string(),
            status,
            elapsed_secs: 0.5,
        };

        assert_eq!(
            task_list(&[task(TaskStatus::Cancelled), task(TaskStatus::Failed("gone".to_string()))]),
            "  [Key Get] GET alpha (cancelled, 0.50s)\n  [Key Get] GET alpha (failed: gone, 0.50s)"
        );
    }
}
