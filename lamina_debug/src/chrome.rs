// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads records from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};

use crate::recorder::{Record, RecordedEvent};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of instant events, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(records: &[Record], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = records.iter().map(event_json).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn event_json(record: &Record) -> Value {
    let ts = micros(record.at);
    match record.event {
        RecordedEvent::FrameLatched(e) => json!({
            "ph": "i",
            "name": "FrameLatched",
            "cat": "Frame",
            "ts": ts,
            "pid": 0,
            "tid": e.slot.0,
            "s": "t",
            "args": {
                "frame_index": e.frame_index,
                "pipeline": format!("{:?}", e.pipeline),
                "buffer": e.buffer.0,
                "outcome": format!("{:?}", e.outcome),
                "release_fence": e.release_fence.map(|f| format!("{f:?}")),
                "force_filter": e.force_filter,
            }
        }),
        RecordedEvent::TextureReleased(e) => json!({
            "ph": "i",
            "name": "TextureReleased",
            "cat": "Slot",
            "ts": ts,
            "pid": 0,
            "tid": e.slot.0,
            "s": "t",
            "args": {
                "mode": format!("{:?}", e.mode),
                "release": format!("{:?}", e.release),
            }
        }),
        RecordedEvent::Detach(e) => json!({
            "ph": "i",
            "name": "Detach",
            "cat": "Lifecycle",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "p",
            "args": {
                "active_slot": e.active_slot.map(|s| s.0),
                "released_consumer": e.released_consumer,
            }
        }),
        RecordedEvent::Teardown(e) => json!({
            "ph": "i",
            "name": "Teardown",
            "cat": "Lifecycle",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "p",
            "args": {
                "mode": format!("{:?}", e.mode),
                "released_textures": e.released_textures,
                "released_layer": e.released_layer,
            }
        }),
    }
}

fn micros(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use crate::recorder::tests::record_lifecycle;

    #[test]
    fn export_produces_valid_json() {
        let recorder = RecorderSink::new();
        record_lifecycle(&recorder);

        let mut out = Vec::new();
        export(&recorder.records(), &mut out).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        let events = parsed.as_array().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["name"], "FrameLatched");
        assert_eq!(events[0]["args"]["outcome"], "Created");
        assert_eq!(events[3]["name"], "Teardown");
        assert_eq!(events[3]["args"]["mode"], "Normal");
    }

    #[test]
    fn empty_export_is_empty_array() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!([]));
    }
}
