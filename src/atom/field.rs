use std::cmp::Ordering;
use std::fmt;

/// Maximum nesting depth of a field path (0-based).
pub const MAX_LOG_DEPTH: i32 = 2;

/// Largest position representable at any depth.
pub const MAX_POS: i32 = 0x7f;

/// Bit marking the last element of a repeated field at some depth.
const LAST_BIT_MASK: i32 = 0x80;

/// Clears the last-element decoration from a position byte.
const CLEAR_LAST_BIT_DECO: i32 = 0x7f;

/// Depth-0 position of the attribution chain. The chain is always the first
/// field of an atom, so everything past this position is outside it.
pub const ATTRIBUTION_FIELD: i32 = 1;

/// Mask selecting the depth-0 and depth-2 positions (without the last bit).
const ATTRIBUTION_UID_MASK: i32 = 0x00ff_007f;

/// Depth-0 position 1, depth-2 position 1: the uid member of a chain node.
const ATTRIBUTION_UID_FIELD: i32 = 0x0001_0001;

/// Encodes a field path into a single integer.
///
/// Layout: depth in bits 24..31, then one byte per depth, depth 0 in the
/// highest byte. Positions beyond `depth` are ignored.
pub fn encode_field(pos: &[i32; 3], depth: i32) -> i32 {
    let mut field = 0;
    for (i, p) in pos.iter().enumerate().take(depth as usize + 1) {
        let shift = 8 * (MAX_LOG_DEPTH - i as i32);
        field |= p << shift;
    }
    field | (depth << 24)
}

/// Location of a scalar inside a structured atom: the atom tag plus the
/// encoded field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field {
    tag: i32,
    field: i32,
}

impl Field {
    /// Creates a field at the given path.
    pub fn new(tag: i32, pos: &[i32; 3], depth: i32) -> Self {
        Self {
            tag,
            field: encode_field(pos, depth),
        }
    }

    /// Atom tag this field belongs to.
    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// Raw encoded field path.
    pub fn field(&self) -> i32 {
        self.field
    }

    /// Nesting depth of this field.
    pub fn depth(&self) -> i32 {
        self.field >> 24
    }

    /// Position at `depth`, with the last-element decoration cleared.
    pub fn pos_at_depth(&self, depth: i32) -> i32 {
        let shift = 8 * (MAX_LOG_DEPTH - depth);
        ((self.field >> shift) & 0xff) & CLEAR_LAST_BIT_DECO
    }

    /// Whether this field is the last element of a repeated field at `depth`.
    pub fn is_last_pos(&self, depth: i32) -> bool {
        let shift = 8 * (MAX_LOG_DEPTH - depth);
        (self.field >> shift) & LAST_BIT_MASK != 0
    }

    /// Marks this field as the last element at `depth`.
    pub fn decorate_last_pos(&mut self, depth: i32) {
        self.field |= LAST_BIT_MASK << (8 * (MAX_LOG_DEPTH - depth));
    }
}

/// Typed scalar carried by a [`FieldValue`].
///
/// Values order by type first, then by value. Floats use the IEEE total
/// order, so `-0.0` and `0.0` are distinct and a NaN equals itself.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Storage(Vec<u8>),
}

impl Value {
    /// Rank used to order values of different types.
    fn type_rank(&self) -> u8 {
        match self {
            Self::Int(_) => 0,
            Self::Long(_) => 1,
            Self::Float(_) => 2,
            Self::Double(_) => 3,
            Self::Str(_) => 4,
            Self::Storage(_) => 5,
        }
    }

    /// Returns the integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Adds `other` into `self` using the native representation.
    ///
    /// Returns false (and leaves `self` untouched) when the types differ or
    /// are not numeric. Integer addition wraps.
    pub fn accumulate(&mut self, other: &Value) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => *a = a.wrapping_add(*b),
            (Self::Long(a), Self::Long(b)) => *a = a.wrapping_add(*b),
            (Self::Float(a), Self::Float(b)) => *a += *b,
            (Self::Double(a), Self::Double(b)) => *a += *b,
            _ => return false,
        }
        true
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Long(a), Self::Long(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Storage(a), Self::Storage(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}[I]"),
            Self::Long(v) => write!(f, "{v}[L]"),
            Self::Float(v) => write!(f, "{v}[F]"),
            Self::Double(v) => write!(f, "{v}[D]"),
            Self::Str(v) => write!(f, "{v}[S]"),
            Self::Storage(v) => write!(f, "{} bytes[ST]", v.len()),
        }
    }
}

/// One scalar at one position of an atom. Ordered by field, then value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FieldValue {
    pub field: Field,
    pub value: Value,
}

impl FieldValue {
    pub fn new(field: Field, value: Value) -> Self {
        Self { field, value }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:#x}){}", self.field.field(), self.value)
    }
}

/// Whether `fv` is the uid member of an attribution chain node.
pub fn is_attribution_uid_field(fv: &FieldValue) -> bool {
    fv.field.field() & ATTRIBUTION_UID_MASK == ATTRIBUTION_UID_FIELD
        && matches!(fv.value, Value::Int(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_top_level_field() {
        let field = Field::new(10, &[3, 0, 0], 0);
        assert_eq!(field.field(), 0x0003_0000);
        assert_eq!(field.depth(), 0);
        assert_eq!(field.pos_at_depth(0), 3);
    }

    #[test]
    fn test_encode_nested_field() {
        let field = Field::new(10, &[1, 2, 1], 2);
        assert_eq!(field.field(), 0x0201_0201);
        assert_eq!(field.depth(), 2);
        assert_eq!(field.pos_at_depth(0), 1);
        assert_eq!(field.pos_at_depth(1), 2);
        assert_eq!(field.pos_at_depth(2), 1);
    }

    #[test]
    fn test_last_pos_decoration() {
        let mut field = Field::new(10, &[1, 4, 2], 2);
        assert!(!field.is_last_pos(1));

        field.decorate_last_pos(1);
        assert!(field.is_last_pos(1));
        assert!(!field.is_last_pos(2));
        // Decoration does not change the logical position.
        assert_eq!(field.pos_at_depth(1), 4);
    }

    #[test]
    fn test_field_ordering_by_tag_then_path() {
        let a = Field::new(1, &[5, 0, 0], 0);
        let b = Field::new(2, &[1, 0, 0], 0);
        let c = Field::new(1, &[6, 0, 0], 0);
        assert!(a < b);
        assert!(a < c);
    }

    #[test]
    fn test_value_ordering_across_types() {
        assert!(Value::Int(100) < Value::Long(1));
        assert!(Value::Long(i64::MAX) < Value::Float(0.0));
        assert!(Value::Str("z".into()) < Value::Storage(vec![]));
        assert!(Value::Double(1.0) < Value::Double(2.0));
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
    }

    #[test]
    fn test_value_float_total_order() {
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert!(Value::Double(-0.0) < Value::Double(0.0));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert!(Value::Double(f64::INFINITY) < Value::Double(f64::NAN));
    }

    #[test]
    fn test_value_accumulate_numeric() {
        let mut v = Value::Int(i32::MAX);
        assert!(v.accumulate(&Value::Int(1)));
        assert_eq!(v, Value::Int(i32::MIN));

        let mut d = Value::Double(1.25);
        assert!(d.accumulate(&Value::Double(0.75)));
        assert_eq!(d, Value::Double(2.0));
    }

    #[test]
    fn test_value_accumulate_rejects_mismatch() {
        let mut v = Value::Int(3);
        assert!(!v.accumulate(&Value::Long(4)));
        assert_eq!(v, Value::Int(3));

        let mut s = Value::Str("a".into());
        assert!(!s.accumulate(&Value::Str("b".into())));
        assert_eq!(s, Value::Str("a".into()));
    }

    #[test]
    fn test_is_attribution_uid_field() {
        let mut uid = FieldValue::new(Field::new(7, &[1, 1, 1], 2), Value::Int(1000));
        assert!(is_attribution_uid_field(&uid));

        // Last-element decorations do not affect detection.
        uid.field.decorate_last_pos(1);
        assert!(is_attribution_uid_field(&uid));

        let tag = FieldValue::new(Field::new(7, &[1, 1, 2], 2), Value::Str("t".into()));
        assert!(!is_attribution_uid_field(&tag));

        let top = FieldValue::new(Field::new(7, &[2, 0, 0], 0), Value::Int(1000));
        assert!(!is_attribution_uid_field(&top));

        let wrong_type = FieldValue::new(Field::new(7, &[1, 1, 1], 2), Value::Long(1000));
        assert!(!is_attribution_uid_field(&wrong_type));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(5).to_string(), "5[I]");
        assert_eq!(Value::Long(100).to_string(), "100[L]");
        assert_eq!(Value::Str("fg".into()).to_string(), "fg[S]");
        assert_eq!(Value::Storage(vec![1, 2, 3]).to_string(), "3 bytes[ST]");
    }
}
