use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;

pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// A single cell value of a record.
///
/// Values are totally ordered so any column can be sorted: `Null` is the
/// lowest value, numbers and money compare numerically, dates
/// chronologically and text lexicographically. Values of different kinds
/// compare by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Money(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) | Value::Money(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }

    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a) | Value::Money(a), Value::Number(b) | Value::Money(b)) => {
                a.total_cmp(b)
            }
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Case folded rendering used for searching. `Null` has nothing to match.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            v => Some(v.to_string().to_lowercase()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{n}"),
            Value::Money(n) => write!(f, "R$ {n}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// The columns of a record shape.
pub trait Field: Copy + Eq + fmt::Debug + 'static {
    /// All fields in display order.
    fn all() -> &'static [Self];

    /// Column header shown to the user.
    fn title(&self) -> &'static str;

    /// Hidden fields can be sorted on but are not rendered.
    fn visible(&self) -> bool {
        true
    }
}

/// One row of domain data.
pub trait Record {
    type Field: Field;

    /// The field the free-text search matches against.
    const SEARCH_FIELD: Self::Field;

    /// Sort column a fresh view starts with.
    const DEFAULT_SORT: Option<Self::Field> = None;

    /// Whether records of this shape can be removed from the console.
    const DELETABLE: bool = false;

    fn id(&self) -> i64;

    fn value(&self, field: Self::Field) -> Value;
}
