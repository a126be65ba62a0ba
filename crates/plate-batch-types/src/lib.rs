//! Shared domain models for the plate-batch workspace.
//!
//! This crate centralizes the lightweight data structures passed between the
//! source, client, redaction, and CLI crates. Keep it transport-agnostic so
//! every crate can depend on it without pulling HTTP or SSH stacks.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One image staged for submission: an identifying name plus the raw bytes.
///
/// Local files are read into the buffer on fetch; remote files are staged
/// through the SFTP channel. The handle is owned by the orchestrator for the
/// duration of one submission and dropped afterwards.
#[derive(Clone)]
pub struct ImageHandle {
    name: String,
    data: Vec<u8>,
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl ImageHandle {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Plate bounding box in pixel coordinates, as returned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// One recognized plate within an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub plate_box: PlateBox,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// The recognition endpoint's response for one image, stored as an
/// order-preserving JSON object.
///
/// The response shape is an audit-significant contract: keys are kept in the
/// order the service sent them and are never normalized. Detections are
/// projected out of the stored object on demand without mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecognitionResult(Map<String, Value>);

impl RecognitionResult {
    /// Wraps a parsed response body. Non-object bodies are preserved under a
    /// `response` key so the report entry still reflects what was received.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(object) => Self(object),
            other => {
                let mut object = Map::new();
                object.insert("response".to_string(), other);
                Self(object)
            }
        }
    }

    /// Synthesizes an entry for a submission that produced no response at
    /// all (transport failure), keeping the report index-aligned.
    pub fn from_failure(filename: &str, message: impl Into<String>) -> Self {
        let mut object = Map::new();
        object.insert(
            "filename".to_string(),
            Value::String(filename.to_string()),
        );
        object.insert("error".to_string(), Value::String(message.into()));
        Self(object)
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Detections from the `results` array. Entries that do not match the
    /// detection shape are skipped; redaction only needs well-formed boxes.
    pub fn detections(&self) -> Vec<Detection> {
        self.0
            .get("results")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Ordered accumulation of per-image results, index-aligned to submission
/// order. Append-only; no deduplication or filtering.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<RecognitionResult>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: RecognitionResult) {
        self.entries.push(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RecognitionResult] {
        &self.entries
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
