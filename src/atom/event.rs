use std::fmt;

use thiserror::Error;

use super::field::{Field, FieldValue, Value, ATTRIBUTION_FIELD, MAX_POS};

/// One (uid, tag) link of an attribution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionNode {
    pub uid: i32,
    pub tag: String,
}

impl AttributionNode {
    pub fn new(uid: i32, tag: impl Into<String>) -> Self {
        Self {
            uid,
            tag: tag.into(),
        }
    }
}

/// Errors that can occur while building a [`LogEvent`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("attribution chain must be the first field, found at position {pos}")]
    AttributionChainNotFirst { pos: i32 },

    #[error("attribution chain has no nodes")]
    EmptyAttributionChain,

    #[error("attribution chain has {nodes} nodes, at most 127 are supported")]
    AttributionChainTooLong { nodes: usize },

    #[error("too many top-level fields: position {pos} exceeds 127")]
    TooManyFields { pos: i32 },

    #[error("uid field annotated twice (positions {first} and {second})")]
    DuplicateUidField { first: i32, second: i32 },

    #[error("event has both an attribution chain and a uid field")]
    ConflictingUidSources,
}

/// A structured metric sample: an atom tag plus its flattened field values.
///
/// The uid indices are fixed when the event is built; the values stay
/// mutable so uids can be rewritten in place.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    tag_id: i32,
    elapsed_timestamp_ns: i64,
    values: Vec<FieldValue>,
    attribution_chain_index: Option<usize>,
    uid_field_index: Option<usize>,
}

impl LogEvent {
    /// Atom tag (schema id) of this event.
    pub fn tag_id(&self) -> i32 {
        self.tag_id
    }

    pub fn elapsed_timestamp_ns(&self) -> i64 {
        self.elapsed_timestamp_ns
    }

    /// Number of flattened field values.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [FieldValue] {
        &mut self.values
    }

    /// Index of the first attribution chain value, if the atom has a chain.
    pub fn attribution_chain_index(&self) -> Option<usize> {
        self.attribution_chain_index
    }

    /// Index of the annotated uid field, if the atom has one.
    pub fn uid_field_index(&self) -> Option<usize> {
        self.uid_field_index
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} {} ", self.tag_id, self.elapsed_timestamp_ns)?;
        for value in &self.values {
            write!(f, "{value} ")?;
        }
        f.write_str("}")
    }
}

/// Writes fields in order and produces a [`LogEvent`] with its uid indices
/// resolved.
///
/// Top-level positions start at 1. The first error is kept and reported by
/// [`LogEventBuilder::build`]; later writes are ignored.
#[derive(Debug)]
pub struct LogEventBuilder {
    tag_id: i32,
    elapsed_timestamp_ns: i64,
    values: Vec<FieldValue>,
    next_pos: i32,
    attribution_chain_index: Option<usize>,
    uid_field_index: Option<usize>,
    uid_pos: i32,
    error: Option<BuildError>,
}

impl LogEventBuilder {
    pub fn new(tag_id: i32, elapsed_timestamp_ns: i64) -> Self {
        Self {
            tag_id,
            elapsed_timestamp_ns,
            values: Vec::with_capacity(8),
            next_pos: 1,
            attribution_chain_index: None,
            uid_field_index: None,
            uid_pos: 0,
            error: None,
        }
    }

    /// Writes an attribution chain. Only valid as the first field.
    pub fn attribution_chain(mut self, nodes: &[AttributionNode]) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.next_pos != ATTRIBUTION_FIELD {
            self.error = Some(BuildError::AttributionChainNotFirst { pos: self.next_pos });
            return self;
        }
        if nodes.is_empty() {
            self.error = Some(BuildError::EmptyAttributionChain);
            return self;
        }
        if nodes.len() > MAX_POS as usize {
            self.error = Some(BuildError::AttributionChainTooLong { nodes: nodes.len() });
            return self;
        }

        let pos0 = self.next_pos;
        self.attribution_chain_index = Some(self.values.len());

        for (i, node) in nodes.iter().enumerate() {
            let pos1 = i as i32 + 1;
            let last_node = i + 1 == nodes.len();

            let mut uid_field = Field::new(self.tag_id, &[pos0, pos1, 1], 2);
            let mut tag_field = Field::new(self.tag_id, &[pos0, pos1, 2], 2);
            tag_field.decorate_last_pos(2);
            if last_node {
                uid_field.decorate_last_pos(1);
                tag_field.decorate_last_pos(1);
            }

            self.values
                .push(FieldValue::new(uid_field, Value::Int(node.uid)));
            self.values
                .push(FieldValue::new(tag_field, Value::Str(node.tag.clone())));
        }

        self.next_pos += 1;
        self
    }

    /// Writes an int annotated as the atom's uid field.
    pub fn uid(mut self, uid: i32) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.uid_field_index.is_some() {
            self.error = Some(BuildError::DuplicateUidField {
                first: self.uid_pos,
                second: self.next_pos,
            });
            return self;
        }
        self.uid_pos = self.next_pos;
        self.uid_field_index = Some(self.values.len());
        self.scalar(Value::Int(uid))
    }

    pub fn int(self, v: i32) -> Self {
        self.scalar(Value::Int(v))
    }

    pub fn long(self, v: i64) -> Self {
        self.scalar(Value::Long(v))
    }

    pub fn float(self, v: f32) -> Self {
        self.scalar(Value::Float(v))
    }

    pub fn double(self, v: f64) -> Self {
        self.scalar(Value::Double(v))
    }

    pub fn string(self, v: impl Into<String>) -> Self {
        self.scalar(Value::Str(v.into()))
    }

    pub fn bytes(self, v: impl Into<Vec<u8>>) -> Self {
        self.scalar(Value::Storage(v.into()))
    }

    /// Booleans are carried as `Int` 0/1.
    pub fn boolean(self, v: bool) -> Self {
        self.scalar(Value::Int(i32::from(v)))
    }

    fn scalar(mut self, value: Value) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.next_pos > MAX_POS {
            self.error = Some(BuildError::TooManyFields { pos: self.next_pos });
            return self;
        }
        let field = Field::new(self.tag_id, &[self.next_pos, 0, 0], 0);
        self.values.push(FieldValue::new(field, value));
        self.next_pos += 1;
        self
    }

    pub fn build(self) -> Result<LogEvent, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.attribution_chain_index.is_some() && self.uid_field_index.is_some() {
            return Err(BuildError::ConflictingUidSources);
        }

        Ok(LogEvent {
            tag_id: self.tag_id,
            elapsed_timestamp_ns: self.elapsed_timestamp_ns,
            values: self.values,
            attribution_chain_index: self.attribution_chain_index,
            uid_field_index: self.uid_field_index,
        })
    }
}
