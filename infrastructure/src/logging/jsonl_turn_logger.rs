//! JSONL transcript of turns.
//!
//! Each [`ConversationEvent`] becomes one JSON line carrying `type`, `seq`
//! and `timestamp`. The file is opened in append mode so transcripts from
//! successive runs accumulate.

use insights_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every record and on `Drop`.
pub struct JsonlTurnLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    seq: AtomicU64,
}

impl JsonlTurnLogger {
    /// Open (or create) the transcript, creating parent directories.
    ///
    /// Returns `None` if the file cannot be opened; the caller runs without
    /// a transcript.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create transcript directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open transcript {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
            seq: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: ConversationEvent) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);

        match event.payload {
            Value::Object(mut map) => {
                map.insert("type".to_string(), json!(event.event_type));
                map.insert("seq".to_string(), json!(seq));
                map.insert("timestamp".to_string(), json!(timestamp));
                Value::Object(map)
            }
            other => json!({
                "type": event.event_type,
                "seq": seq,
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl ConversationLogger for JsonlTurnLogger {
    fn log(&self, event: ConversationEvent) {
        let record = self.record(event);
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                warn!("Transcript write to {} failed: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for JsonlTurnLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_record_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcripts").join("turns.jsonl");
        let logger = JsonlTurnLogger::open(&path).unwrap();

        logger.log(ConversationEvent::new(
            "turn_received",
            json!({"session_id": "s1", "text": "What's my ROI?"}),
        ));
        logger.log(ConversationEvent::new(
            "plan_built",
            json!({"session_id": "s1", "tools": ["calculate_security_roi"]}),
        ));
        drop(logger);

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "turn_received");
        assert_eq!(records[0]["text"], "What's my ROI?");
        assert_eq!(records[0]["seq"], 0);
        assert_eq!(records[1]["type"], "plan_built");
        assert_eq!(records[1]["seq"], 1);
        assert!(records.iter().all(|r| r["timestamp"].is_string()));
    }

    #[test]
    fn test_non_object_payload_goes_under_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.jsonl");
        let logger = JsonlTurnLogger::open(&path).unwrap();

        logger.log(ConversationEvent::new("session_closed", json!("s1")));
        drop(logger);

        let records = read_lines(&path);
        assert_eq!(records[0]["type"], "session_closed");
        assert_eq!(records[0]["data"], "s1");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.jsonl");

        for text in ["first", "second"] {
            let logger = JsonlTurnLogger::open(&path).unwrap();
            logger.log(ConversationEvent::new("turn_received", json!({"text": text})));
        }

        let records = read_lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["text"], "second");
    }

    #[test]
    fn test_open_fails_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlTurnLogger::open(dir.path()).is_none());
    }
}
