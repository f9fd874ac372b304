pub mod event;
pub mod field;
pub mod record;

pub use event::{AttributionNode, BuildError, LogEvent, LogEventBuilder};
pub use field::{is_attribution_uid_field, Field, FieldValue, Value, ATTRIBUTION_FIELD};
