//! Incremental event-stream parser.
//!
//! Parses server-sent-event framing out of arbitrarily chunked text:
//! records are separated by a blank line; within a record an `event:` line
//! names the event (default `message`) and one or more `data:` lines are
//! concatenated, each stripped of a single leading space. Partial records
//! spanning chunk boundaries stay buffered until the terminating blank
//! line arrives. Independent of the transport read loop so it can be
//! tested without a network.

/// One complete `(event, data)` record extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    pub event: String,
    pub data: String,
}

/// Buffering parser fed with decoded text chunks.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: String,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every record completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<SseRecord> {
        self.buffer.push_str(chunk);

        let mut records = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..end + 2).collect();
            if let Some(record) = parse_record(raw.trim_end_matches('\n')) {
                records.push(record);
            }
        }
        records
    }

    /// Unconsumed partial record, if any.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

fn parse_record(raw: &str) -> Option<SseRecord> {
    let mut event = "message";
    let mut data = String::new();
    for line in raw.split('\n') {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data.is_empty() {
        return None;
    }
    Some(SseRecord {
        event: event.to_string(),
        data,
    })
}
