use std::cmp::Ordering;

/// Floating point value type alias
pub type Float = f64;
/// Integer value type alias
pub type Integer = i64;
/// Literal type alias
pub type Text = String;

#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// Occurs when a value has a type the operation cannot order, e.g. a text bound in a
    /// numeric range.
    #[error("wrong type")]
    WrongType,

    /// Unsupported operation
    #[error("unsupported operation")]
    UnsupportedOperation,

    /// Occurs when constructing a [`Range`] where `min > max`.
    #[error("empty range")]
    EmptyRange,
}

/// A wrapper enum to allow heterogeneous column values (numbers, strings, booleans,
/// binary data and `NULL`) to coexist in a single row or parameter list.
#[derive(Debug, Clone, PartialEq, PartialOrd, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(Integer),
    Float(Float),
    Text(Text),
    Boolean(bool),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Replaces a `NULL` with an integer zero, any other value is returned unchanged.
    ///
    /// Aggregates computed over an empty set of rows produce `NULL`, callers of the
    /// aggregate helpers get `0` instead.
    pub fn or_zero(self) -> Self {
        match self {
            Self::Null => Self::Integer(0),
            v => v,
        }
    }

    pub fn as_i64(&self) -> Option<Integer> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Boolean(v) => Some(Integer::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<Float> {
        match self {
            Self::Integer(v) => Some(*v as Float),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Blob(v) => {
                write!(f, "x'")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "'")
            }
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Blob(b.to_vec())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A trait that indicates which combinations of [`Value`]s and [`Op`]s
/// are supported by an implementing type.
///
/// Each method corresponds to a capability check for a particular
/// operation. By default, all operations are unsupported (`false`).
/// Implementors should override the methods for the operations they
/// support.
///
/// These checks are performed at **runtime**.
pub trait IsSupportedOp {
    fn support_eq(&self) -> bool {
        false
    }
    fn support_ordering(&self) -> bool {
        false
    }
    fn support_in(&self) -> bool {
        false
    }
    fn support_match(&self) -> bool {
        false
    }
}

impl IsSupportedOp for Value {
    fn support_eq(&self) -> bool {
        // `x = NULL` is never true, use `Op::Nex` instead
        !self.is_null()
    }

    fn support_ordering(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    fn support_in(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_) | Self::Text(_))
    }

    fn support_match(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl Range<Value> {
    /// Builds the range `[min, max]` over numeric bounds.
    ///
    /// Integers and floats are compared by their numeric value, so mixed bounds such
    /// as `1` and `2.5` are accepted. Any other bound is refused.
    pub fn try_new(min: Value, max: Value) -> Result<Self, OpError> {
        let ordering = match (&min, &max) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => return Err(OpError::WrongType),
            },
        };

        match ordering {
            Some(Ordering::Greater) => Err(OpError::EmptyRange),
            Some(_) => Ok(Self { min, max }),
            // NaN
            None => Err(OpError::WrongType),
        }
    }
}

/// Represents the logical operator to apply to a field for filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum Op<T> {
    /// Equal
    Eq(T),
    /// Not equal
    Neq(T),
    /// Less than or equal
    Leq(T),
    /// Greater then or equal
    Geq(T),
    /// Lower then
    Lt(T),
    /// Greater then
    Gt(T),
    /// Exists (`IS NOT NULL`)
    Ex,
    /// Not exists (`IS NULL`)
    Nex,
    /// In between a two value range [a, b] with a <= b
    Between(Range<T>),
    /// Found in a set
    In(Vec<T>),
    /// Contains the given text
    Match(T),
}

impl<T> Op<T>
where
    T: IsSupportedOp,
{
    pub fn is_supported_op(&self) -> bool {
        match self {
            Self::Eq(v) => v.support_eq(),
            Op::Neq(v) => v.support_eq(),
            Op::Leq(v) => v.support_ordering(),
            Op::Geq(v) => v.support_ordering(),
            Op::Lt(v) => v.support_ordering(),
            Op::Gt(v) => v.support_ordering(),
            Op::Ex => true,
            Op::Nex => true,
            Op::Between(range) => range.min.support_ordering() && range.max.support_ordering(),
            Op::In(items) => items.iter().all(IsSupportedOp::support_in),
            Op::Match(v) => v.support_match(),
        }
    }
}

/// Checks that `name` is a plain SQL identifier, optionally qualified by a table
/// name (`table.column`).
///
/// Identifiers are spliced into the generated SQL, values never are.
pub fn validate_identifier(name: &str) -> Result<&str, super::Error> {
    let bad_field = || super::Error::BadField {
        field: name.to_string(),
    };

    let mut parts = 0;
    for part in name.split('.') {
        parts += 1;
        let mut chars = part.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(bad_field());
        }
    }

    if parts > 2 {
        return Err(bad_field());
    }

    Ok(name)
}

/// A column reference, either bare (`total`) or qualified (`orders.total`).
///
/// The name is validated when the statement using it is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column(String);

/// Shorthand for [`Column::from`].
pub fn col(name: &str) -> Column {
    Column::from(name)
}

impl From<&str> for Column {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Column {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Column {
    pub fn qualified(table: &str, column: &str) -> Self {
        Self(format!("{table}.{column}"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns the column name if it is a valid identifier.
    pub fn sql(&self) -> Result<&str, super::Error> {
        validate_identifier(&self.0)
    }

    fn op(&self, op: Op<Value>) -> Condition {
        Condition {
            column: self.clone(),
            op,
        }
    }

    pub fn eq(&self, v: impl Into<Value>) -> Condition {
        self.op(Op::Eq(v.into()))
    }

    pub fn neq(&self, v: impl Into<Value>) -> Condition {
        self.op(Op::Neq(v.into()))
    }

    pub fn leq(&self, v: impl Into<Value>) -> Condition {
        self.op(Op::Leq(v.into()))
    }

    pub fn geq(&self, v: impl Into<Value>) -> Condition {
        self.op(Op::Geq(v.into()))
    }

    pub fn lt(&self, v: impl Into<Value>) -> Condition {
        self.op(Op::Lt(v.into()))
    }

    pub fn gt(&self, v: impl Into<Value>) -> Condition {
        self.op(Op::Gt(v.into()))
    }

    pub fn is_not_null(&self) -> Condition {
        self.op(Op::Ex)
    }

    pub fn is_null(&self) -> Condition {
        self.op(Op::Nex)
    }

    pub fn between(
        &self,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Result<Condition, super::Error> {
        let range = Range::try_new(min.into(), max.into()).map_err(|err| super::Error::OpError {
            field: self.0.clone(),
            err,
        })?;
        Ok(self.op(Op::Between(range)))
    }

    pub fn is_in<I, V>(&self, items: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.op(Op::In(items.into_iter().map(Into::into).collect()))
    }

    /// Matches rows where the column contains `text`.
    pub fn contains(&self, text: impl Into<String>) -> Condition {
        self.op(Op::Match(Value::Text(text.into())))
    }
}

/// A single predicate over a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: Column,
    pub op: Op<Value>,
}

/// A conjunction of [`Condition`]s. An empty filter selects every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Vec<Condition>);

impl Filter {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }

    /// The filter matching every row.
    pub fn all() -> Self {
        Self(Vec::new())
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.0.push(condition);
        self
    }

    /// Returns true if there are no conditions applied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }
}

impl From<Vec<Condition>> for Filter {
    fn from(value: Vec<Condition>) -> Self {
        Self(value)
    }
}

impl From<Condition> for Filter {
    fn from(value: Condition) -> Self {
        Self(vec![value])
    }
}
