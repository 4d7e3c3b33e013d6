use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::*;
use planillas::commands::{CmdMessage, CmdResult, MessageLevel};
use planillas::model::{PlanillaRecord, SyncStatus};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Text,
    Json,
}

pub fn print_result(result: &CmdResult, mode: RenderMode) -> Result<()> {
    let output = match mode {
        RenderMode::Json => serde_json::to_string_pretty(result)? + "\n",
        RenderMode::Text => render_text(result),
    };
    print!("{}", output);
    Ok(())
}

pub fn render_text(result: &CmdResult) -> String {
    let mut out = String::new();
    match result.listed.as_slice() {
        [record] if result.affected.is_empty() => out.push_str(&render_detail(record)),
        [] => {}
        records => {
            for record in records {
                out.push_str(&render_row(record));
                out.push('\n');
            }
        }
    }
    for file in &result.uploads {
        out.push_str(&format!("{}  {}\n", file.filename.bold(), file.url.dimmed()));
    }
    out.push_str(&render_messages(&result.messages));
    if out.is_empty() {
        out.push_str("No planillas found.\n");
    }
    out
}

fn render_row(record: &PlanillaRecord) -> String {
    format!(
        "{}  {:<8}  {:<30}  {:>2} img  {}",
        record.id.to_string().yellow(),
        status_label(record.sync_status),
        title_of(&record.meta),
        record.images.len(),
        format_time_ago(record.updated_at).dimmed()
    )
}

fn render_detail(record: &PlanillaRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", record.id.to_string().yellow(), title_of(&record.meta).bold()));
    out.push_str(&format!("  status   {}\n", status_label(record.sync_status)));
    if let Some(remote_id) = &record.remote_id {
        out.push_str(&format!("  remote   {}\n", remote_id));
    }
    out.push_str(&format!("  created  {}\n", format_time_ago(record.created_at)));
    out.push_str(&format!("  updated  {}\n", format_time_ago(record.updated_at)));
    out.push_str(&format!("  snapshot {}\n", record.snapshot_path));
    for image in &record.images {
        out.push_str(&format!("  image    {} ({})\n", image.filename, image.original_name));
    }
    let meta = serde_json::to_string_pretty(&record.meta).unwrap_or_default();
    out.push_str("--------------------------------\n");
    out.push_str(&meta);
    out.push('\n');
    out
}

pub fn render_messages(messages: &[CmdMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let content = match m.level {
                MessageLevel::Info => m.content.normal(),
                MessageLevel::Success => m.content.green(),
                MessageLevel::Warning => m.content.yellow(),
                MessageLevel::Error => m.content.red(),
            };
            format!("{}\n", content)
        })
        .collect()
}

fn status_label(status: SyncStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        SyncStatus::Synced => label.green(),
        SyncStatus::Pending => label.yellow(),
        SyncStatus::Error => label.red(),
    }
}

/// Metadata is opaque; show its `title` when it has one.
fn title_of(meta: &Value) -> String {
    meta.get("title")
        .and_then(Value::as_str)
        .unwrap_or("(untitled)")
        .to_string()
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    timeago::Formatter::new().convert(duration.to_std().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn record(title: &str, status: SyncStatus) -> PlanillaRecord {
        let now = Utc::now();
        PlanillaRecord {
            id: Uuid::new_v4(),
            snapshot_filename: "planilla_1_x.json".into(),
            snapshot_path: "/uploads/planillas/planilla_1_x.json".into(),
            created_at: now,
            updated_at: now,
            sync_status: status,
            remote_id: None,
            images: vec![],
            meta: json!({ "title": title }),
        }
    }

    #[test]
    fn test_render_empty_list() {
        colored::control::set_override(false);
        assert_eq!(render_text(&CmdResult::default()), "No planillas found.\n");
    }

    #[test]
    fn test_render_list_rows() {
        colored::control::set_override(false);
        let result = CmdResult::default().with_listed(vec![
            record("Primera", SyncStatus::Synced),
            record("Segunda", SyncStatus::Pending),
        ]);
        let out = render_text(&result);
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("Primera"));
        assert!(out.contains("pending"));
    }

    #[test]
    fn test_render_single_record_as_detail() {
        colored::control::set_override(false);
        let result = CmdResult::default().with_listed(vec![record("Única", SyncStatus::Error)]);
        let out = render_text(&result);
        assert!(out.contains("status   error"));
        assert!(out.contains("\"title\": \"Única\""));
    }

    #[test]
    fn test_untitled_meta() {
        assert_eq!(title_of(&json!([1, 2])), "(untitled)");
    }

    #[test]
    fn test_json_mode_serializes_result() {
        let result = CmdResult::default().with_affected(vec![record("A", SyncStatus::Synced)]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["affected"][0]["syncStatus"], "synced");
        assert_eq!(value["affected"][0]["meta"]["title"], "A");
    }
}
