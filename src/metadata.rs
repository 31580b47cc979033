//! Metadata codec for application-private task fields.
//!
//! The remote task schema has no labels, priorities, subtasks, or
//! recurrence. Those fields survive the round trip by riding along as a
//! single trailing marker in the free-text notes field:
//!
//! ```text
//! Pick up the dry cleaning[TASKMIRROR:v1:{"priority":"high"}]
//! ```
//!
//! This module is the only place that marker is produced or consumed.
//! Decoding is total: a malformed marker is logged and discarded, the
//! visible notes are returned unchanged, and no error escapes.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{METADATA_NAMESPACE, METADATA_VERSION};
use crate::model::{Priority, Recurrence, Subtask};

/// Application-private fields unknown to the remote schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskExtras {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "is_default_priority")]
    pub priority: Priority,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
    #[serde(skip_serializing_if = "Recurrence::is_default")]
    pub recurring: Recurrence,
}

fn is_default_priority(p: &Priority) -> bool {
    *p == Priority::default()
}

impl TaskExtras {
    /// Whether every field still holds its default value.
    pub fn is_empty(&self) -> bool {
        *self == TaskExtras::default()
    }
}

/// Result of stripping the metadata marker from a raw notes field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedNotes {
    /// User-visible notes with the marker removed.
    pub clean_notes: String,
    pub extras: TaskExtras,
}

/// Append the metadata marker to the visible notes.
///
/// Empty extras encode to the bare notes so tasks without private fields
/// stay clean on the remote side.
pub fn encode(notes: &str, extras: &TaskExtras) -> String {
    if extras.is_empty() {
        return notes.to_string();
    }
    let json = match serde_json::to_string(extras) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize task metadata, dropping it: {e}");
            return notes.to_string();
        }
    };
    format!("{notes}[{METADATA_NAMESPACE}:{METADATA_VERSION}:{json}]")
}

/// Strip and parse the trailing metadata marker, if any.
pub fn decode(raw_notes: &str) -> DecodedNotes {
    let Some(start) = find_marker_start(raw_notes) else {
        return DecodedNotes {
            clean_notes: raw_notes.to_string(),
            extras: TaskExtras::default(),
        };
    };

    let payload = marker_payload(&raw_notes[start..]);
    match serde_json::from_str::<TaskExtras>(payload) {
        Ok(extras) => DecodedNotes {
            clean_notes: raw_notes[..start].to_string(),
            extras,
        },
        Err(e) => {
            warn!("malformed task metadata marker, keeping raw notes: {e}");
            DecodedNotes {
                clean_notes: raw_notes.to_string(),
                extras: TaskExtras::default(),
            }
        }
    }
}

/// Byte offset of the trailing marker, or `None` if the notes carry none.
///
/// The marker must be the suffix of the notes; a namespace tag in the
/// middle of user text is left alone.
fn find_marker_start(raw: &str) -> Option<usize> {
    if !raw.ends_with(']') {
        return None;
    }
    let versioned = format!("[{METADATA_NAMESPACE}:{METADATA_VERSION}:");
    let legacy = format!("[{METADATA_NAMESPACE}:");
    let start = raw.rfind(&versioned).or_else(|| raw.rfind(&legacy))?;
    Some(start)
}

/// The JSON payload inside a marker slice (`[NS:v1:<json>]` or the
/// unversioned `[NS:<json>]` form from before the format was versioned).
fn marker_payload(marker: &str) -> &str {
    let inner = &marker[1..marker.len() - 1];
    let after_ns = &inner[METADATA_NAMESPACE.len() + 1..];
    match after_ns.strip_prefix(&format!("{METADATA_VERSION}:")) {
        Some(payload) => payload,
        None => after_ns,
    }
}
