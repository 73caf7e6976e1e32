//! utilities related to database queries
//!
use serde::{
    Deserialize, Serialize,
    de::{IntoDeserializer, value},
};
use std::{ops::Deref, str::FromStr, sync::Arc};

pub mod filter {
    use super::DynFilterPart;

    /// An operator for combining filter parts to form a more complex filter expression
    #[derive(Clone)]
    pub enum Op {
        Or,
        And,
    }

    #[derive(Clone)]
    /// An object that allows you easily build compound filters that can be applied to SQL queries
    pub struct CompoundFilterBuilder {
        pub(crate) top: CompoundFilter,
    }

    pub fn and() -> CompoundFilterBuilder {
        CompoundFilterBuilder::new(Op::And)
    }

    pub fn or() -> CompoundFilterBuilder {
        CompoundFilterBuilder::new(Op::Or)
    }

    impl CompoundFilterBuilder {
        pub fn new(op: Op) -> Self {
            Self {
                top: CompoundFilter::new(op),
            }
        }

        /// Add a new filter expression. It will be combined with all existing
        /// expressions using the operator given to the constructor.
        pub fn push<F: Into<DynFilterPart>>(mut self, filter: F) -> Self {
            self.top.add_filter(filter.into());
            self
        }

        pub fn is_empty(&self) -> bool {
            self.top.conditions.is_empty()
        }

        pub fn build(self) -> DynFilterPart {
            self.top.into()
        }
    }

    /// A Trait implemented by anything that can be a filter. It could be a single field or a
    /// multi-level compound filter condition.
    pub trait FilterPart: Send {
        /// convert the given filter part to SQL syntax and add it to the given [sqlx::QueryBuilder] object
        fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>);
    }

    #[derive(Clone)]
    /// One or more filter conditions combined by a single logical operator ([Op])
    pub struct CompoundFilter {
        pub(crate) conditions: Vec<DynFilterPart>,
        pub(crate) op: Op,
    }

    impl CompoundFilter {
        pub fn new(op: Op) -> Self {
            Self {
                conditions: Default::default(),
                op,
            }
        }

        pub fn add_filter(&mut self, filter: DynFilterPart) {
            self.conditions.push(filter);
        }
    }

    impl FilterPart for CompoundFilter {
        fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
            if self.conditions.is_empty() {
                builder.push("TRUE");
                return;
            }

            let separator = match self.op {
                Op::And => " AND ",
                Op::Or => " OR ",
            };
            builder.push(" (");
            for (i, cond) in self.conditions.iter().enumerate() {
                if i > 0 {
                    builder.push(separator);
                }
                cond.add_to_query(builder);
            }
            builder.push(")");
        }
    }

    #[derive(Clone)]
    /// The comparison operator that is used in a filter expression
    pub enum Cmp {
        Equal,
        Like,
    }

    impl std::fmt::Display for Cmp {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            match self {
                Cmp::Equal => write!(f, " IS "),
                Cmp::Like => write!(f, " LIKE "),
            }
        }
    }

    impl Cmp {
        /// Wraps a string fragment in wildcards when used with [Cmp::Like]
        pub fn pattern(&self, frag: &str) -> String {
            match self {
                Cmp::Like => format!("%{frag}%"),
                Cmp::Equal => frag.to_string(),
            }
        }
    }
}

/// A type for specifying the number of rows to return for an SQL query
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct LimitSpec {
    pub count: i32,
    /// An optional offset, e.g. `Some(10)` starts returning items at the 10th row
    pub offset: Option<i32>,
}

impl From<i32> for LimitSpec {
    fn from(count: i32) -> Self {
        LimitSpec {
            count,
            offset: None,
        }
    }
}

impl ToSql for LimitSpec {
    fn to_sql(&self) -> String {
        match self.offset {
            None => format!("LIMIT {}", self.count),
            Some(offset) => format!("LIMIT {} OFFSET {offset}", self.count),
        }
    }
}

/// A type for specifying the sort order of an SQL query
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    #[default]
    Descending,
}

impl FromStr for SortOrder {
    type Err = value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let deserializer = s.into_deserializer();
        Deserialize::deserialize(deserializer)
    }
}

impl ToSql for SortOrder {
    fn to_sql(&self) -> String {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
        .into()
    }
}

/// a trait that generates an sql respresentation of the implementing type
pub trait ToSql {
    fn to_sql(&self) -> String;
}

#[derive(Clone)]
pub struct DynFilterPart(Arc<dyn filter::FilterPart + Sync>);

impl Deref for DynFilterPart {
    type Target = Arc<dyn filter::FilterPart + Sync>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<F> From<F> for DynFilterPart
where
    F: filter::FilterPart + Send + Sync + 'static,
{
    fn from(value: F) -> Self {
        DynFilterPart(Arc::new(value))
    }
}
