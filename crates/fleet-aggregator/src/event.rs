//! Worker event-stream frame decoding.
//!
//! Frames are textual JSON `{type, data}`; binary frames (image previews)
//! are ignored by the caller before reaching this module.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Progress {
        value: u32,
        max: u32,
        prompt_id: Option<String>,
    },
    Executed {
        node: String,
        prompt_id: String,
        has_images: bool,
    },
    ExecutionComplete {
        prompt_id: String,
    },
    ExecutionError {
        prompt_id: String,
        exception_message: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

/// Decodes one textual frame. Returns `None` for a type this aggregator
/// does not act on, or for any frame that fails to parse — decode
/// failures are swallowed, the frame is simply discarded.
pub fn decode_frame(text: &str) -> Option<WorkerEvent> {
    let frame: RawFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "discarding undecodable worker event frame");
            return None;
        }
    };

    match frame.kind.as_str() {
        "progress" => Some(WorkerEvent::Progress {
            value: frame.data.get("value")?.as_u64()? as u32,
            max: frame.data.get("max")?.as_u64()? as u32,
            prompt_id: frame
                .data
                .get("prompt_id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }),
        "executed" => {
            let node = frame.data.get("node")?.as_str()?.to_string();
            let prompt_id = frame.data.get("prompt_id")?.as_str()?.to_string();
            let has_images = frame
                .data
                .get("output")
                .and_then(|o| o.get("images"))
                .is_some();
            Some(WorkerEvent::Executed {
                node,
                prompt_id,
                has_images,
            })
        }
        "execution_complete" => Some(WorkerEvent::ExecutionComplete {
            prompt_id: frame.data.get("prompt_id")?.as_str()?.to_string(),
        }),
        "execution_error" => Some(WorkerEvent::ExecutionError {
            prompt_id: frame.data.get("prompt_id")?.as_str()?.to_string(),
            exception_message: frame
                .data
                .get("exception_message")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        }),
        other => {
            tracing::debug!(kind = other, "ignoring unrecognized worker event type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_progress_with_prompt_id() {
        let frame = r#"{"type":"progress","data":{"value":5,"max":10,"prompt_id":"p1"}}"#;
        assert_eq!(
            decode_frame(frame),
            Some(WorkerEvent::Progress {
                value: 5,
                max: 10,
                prompt_id: Some("p1".into())
            })
        );
    }

    #[test]
    fn decodes_progress_without_prompt_id() {
        let frame = r#"{"type":"progress","data":{"value":5,"max":10}}"#;
        assert_eq!(
            decode_frame(frame),
            Some(WorkerEvent::Progress {
                value: 5,
                max: 10,
                prompt_id: None
            })
        );
    }

    // An empty `images` array still counts as present — the worker only
    // ever omits the key entirely for a non-image node.
    #[test]
    fn executed_with_empty_images_array_is_still_has_images() {
        let frame = r#"{"type":"executed","data":{"node":"9","prompt_id":"p1","output":{"images":[]}}}"#;
        assert_eq!(
            decode_frame(frame),
            Some(WorkerEvent::Executed {
                node: "9".into(),
                prompt_id: "p1".into(),
                has_images: true
            })
        );
    }

    #[test]
    fn executed_without_images_key_is_not_flagged() {
        let frame = r#"{"type":"executed","data":{"node":"9","prompt_id":"p1","output":{}}}"#;
        assert_eq!(
            decode_frame(frame),
            Some(WorkerEvent::Executed {
                node: "9".into(),
                prompt_id: "p1".into(),
                has_images: false
            })
        );
    }

    #[test]
    fn malformed_frame_is_discarded() {
        assert_eq!(decode_frame("not json"), None);
    }
}
