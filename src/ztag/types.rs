//! Data types for parsed tagged output.

/// A single field value inside a [`Record`].
///
/// `-ztag` values are implicitly typed: a field with no value at all is a
/// presence flag, a purely numeric value is a changelist number or similar
/// counter, and everything else is text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Free-form text value.
    Text(String),
    /// Strictly numeric value (changelist numbers, revision counts).
    Integer(i64),
    /// Key present with no value.
    Flag,
}

impl Value {
    /// Get the text content, if this is a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the numeric content, if this is an `Integer` value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// One structured key/value group parsed from tagged output.
///
/// Field order is insertion order. Keys are assumed unique within a record;
/// a duplicate key overwrites the earlier value in place (upstream behavior
/// is undefined here, so nothing is normalized).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, overwriting any existing value for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    /// Look up a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a text field by key.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    /// Look up an integer field by key.
    #[must_use]
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_integer)
    }

    /// Whether the record holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One entry in the parser's output sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Raw lines captured before the first record marker, or the whole
    /// output if no marker exists.
    Preamble(Vec<String>),
    /// A structured key/value group.
    Record(Record),
    /// Trailing lines of a multi-line value captured when multi-line mode
    /// was off; immediately follows its owning record.
    Overflow(Vec<String>),
}

impl Entry {
    /// Get the record, if this entry is one.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }
}
