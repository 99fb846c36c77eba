use super::{Column, Filter, Value};

/// Aggregate functions available to the projection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFn {
    Sum,
    Max,
    Min,
    Avg,
    Count,
}

impl AggFn {
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
        }
    }
}

/// One item of a `SELECT` list.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Every column of the queried tables (`*`)
    All,
    Column(Column),
    Aggregate(AggFn, Column),
}

impl From<Column> for Projection {
    fn from(value: Column) -> Self {
        Self::Column(value)
    }
}

impl From<&str> for Projection {
    fn from(value: &str) -> Self {
        Self::Column(Column::from(value))
    }
}

impl Projection {
    pub fn sql(&self) -> Result<String, super::Error> {
        Ok(match self {
            Self::All => "*".to_string(),
            Self::Column(c) => c.sql()?.to_string(),
            Self::Aggregate(f, c) => format!("{}({})", f.sql_name(), c.sql()?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: Column,
    pub direction: Direction,
}

impl Column {
    pub fn asc(&self) -> OrderBy {
        OrderBy {
            column: self.clone(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(&self) -> OrderBy {
        OrderBy {
            column: self.clone(),
            direction: Direction::Desc,
        }
    }
}

/// Options of a read query: filter, grouping, ordering and window.
///
/// ```
/// use modelkit::query::{col, Select};
///
/// let select = Select::new()
///     .filter(col("order_id").geq(1))
///     .order_by(col("order_id").desc())
///     .limit(10)
///     .offset(0);
///
/// assert_eq!(select.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub filter: Filter,
    pub group_by: Vec<Column>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn group_by(mut self, columns: Vec<Column>) -> Self {
        self.group_by = columns;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// The `SET` list of an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignments(Vec<(Column, Value)>);

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<Column>, value: impl Into<Value>) -> Self {
        self.0.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Column, Value)> {
        self.0.iter()
    }
}

/// Equality between a column of the left table and a column of the right table.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOn {
    pub left: Column,
    pub right: Column,
}

impl JoinOn {
    pub fn new(left: impl Into<Column>, right: impl Into<Column>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}
