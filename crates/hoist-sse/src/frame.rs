//! SSE frame encoding.

/// Reserved event name that terminates a stream cleanly. Carries no data.
pub const END_EVENT: &str = "end";

/// A single server-sent-event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event ID. IDs within one stream strictly increase.
    pub id: Option<u64>,
    /// Event name.
    pub name: String,
    /// Payload, typically a JSON document. Empty for the end sentinel.
    pub data: String,
}

impl Frame {
    /// Encode this frame to its wire text, including the trailing blank
    /// line that delimits frames.
    pub fn encode(&self) -> String {
        let mut out = String::new();

        if let Some(id) = self.id {
            out.push_str("id: ");
            out.push_str(&id.to_string());
            out.push('\n');
        }

        out.push_str("event: ");
        out.push_str(&self.name);
        out.push('\n');

        // Multi-line payloads become one data: line per line; decoders
        // rejoin them with newlines. Always emit at least one data line,
        // even when empty: spec-compliant consumers never dispatch a
        // frame whose data buffer is empty.
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }

        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_id_name_and_data() {
        let frame = Frame {
            id: Some(7),
            name: "event".to_string(),
            data: r#"{"x":1}"#.to_string(),
        };
        assert_eq!(frame.encode(), "id: 7\nevent: event\ndata: {\"x\":1}\n\n");
    }

    #[test]
    fn end_frame_keeps_an_empty_data_line() {
        let frame = Frame { id: Some(2), name: END_EVENT.to_string(), data: String::new() };
        assert_eq!(frame.encode(), "id: 2\nevent: end\ndata: \n\n");
    }

    #[test]
    fn multiline_data_splits_into_data_lines() {
        let frame = Frame { id: None, name: "log".to_string(), data: "a\nb".to_string() };
        assert_eq!(frame.encode(), "event: log\ndata: a\ndata: b\n\n");
    }
}
