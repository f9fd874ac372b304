//! Serialized form of pulled events, used for fixtures and the CLI.
//!
//! ```yaml
//! - tag: 10000
//!   elapsed_ns: 0
//!   fields:
//!     - uid: 1001
//!     - string: fg
//!     - long: 100
//! ```

use serde::Deserialize;
use thiserror::Error;

use super::event::{AttributionNode, BuildError, LogEvent, LogEventBuilder};

/// Errors that can occur while decoding event records.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("decoding event records: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("event record {index} (tag {tag}): {source}")]
    Build {
        index: usize,
        tag: i32,
        #[source]
        source: BuildError,
    },
}

/// One pulled event as written in a record file.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub tag: i32,
    #[serde(default)]
    pub elapsed_ns: i64,
    /// Each field is a single-key map (`- uid: 1001`), not a YAML tag.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub fields: Vec<FieldRecord>,
}

/// A single top-level field of an [`EventRecord`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRecord {
    AttributionChain(Vec<AttributionNodeRecord>),
    Uid(i32),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Bool(bool),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributionNodeRecord {
    pub uid: i32,
    #[serde(default)]
    pub tag: String,
}

impl EventRecord {
    /// Converts this record into a [`LogEvent`].
    pub fn to_log_event(&self) -> Result<LogEvent, BuildError> {
        let mut builder = LogEventBuilder::new(self.tag, self.elapsed_ns);
        for field in &self.fields {
            builder = match field {
                FieldRecord::AttributionChain(nodes) => {
                    let nodes: Vec<AttributionNode> = nodes
                        .iter()
                        .map(|n| AttributionNode::new(n.uid, n.tag.as_str()))
                        .collect();
                    builder.attribution_chain(&nodes)
                }
                FieldRecord::Uid(v) => builder.uid(*v),
                FieldRecord::Int(v) => builder.int(*v),
                FieldRecord::Long(v) => builder.long(*v),
                FieldRecord::Float(v) => builder.float(*v),
                FieldRecord::Double(v) => builder.double(*v),
                FieldRecord::String(v) => builder.string(v.as_str()),
                FieldRecord::Bytes(v) => builder.bytes(v.as_slice()),
                FieldRecord::Bool(v) => builder.boolean(*v),
            };
        }
        builder.build()
    }
}

/// Decodes a YAML list of event records into log events.
pub fn parse_records(yaml: &str) -> Result<Vec<LogEvent>, RecordError> {
    let records: Vec<EventRecord> = serde_yaml::from_str(yaml)?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record.to_log_event().map_err(|source| RecordError::Build {
                index,
                tag: record.tag,
                source,
            })
        })
        .collect()
}
