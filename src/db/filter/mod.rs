//! Article filter language
//!
//! Caller filters arrive as JSON and are parsed into a typed predicate tree
//! against the allow-list in [`schema`]. The tree is then compiled into a
//! parameterised SQL fragment. Caller data is only ever bound as a parameter.
//!
//! ```ignore
//! use articlebox::db::filter::{Parser, Predicate};
//!
//! let caller = Parser::strict().parse_where(Model::Article, &json!({"title": {"contains": "rust"}}))?;
//! let effective = Predicate::and(vec![Predicate::published(true), caller]);
//! ```

pub mod compile;
pub mod parse;
pub mod schema;

pub use compile::{compile_find, compile_where, SqlFragment};
pub use parse::{Parser, ScalarDecoding};
pub use schema::{Column, Model, Relation};

/// A decoded scalar, also used as a bound SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

/// Binary comparison against a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOp {
    Equals,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

/// Condition on one scalar column
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarCondition {
    Compare { op: ScalarOp, value: ScalarValue },
    In(Vec<ScalarValue>),
    NotIn(Vec<ScalarValue>),
    Not(Box<ScalarCondition>),
    /// Every listed condition must hold; empty holds for every row
    All(Vec<ScalarCondition>),
}

/// How a relation filter ranges over the related rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// To-one: the related row matches
    Is,
    /// To-one: the related row does not match
    IsNot,
    /// To-many: at least one related row matches
    Some,
    /// To-many: every related row matches (vacuously true when there are none)
    Every,
    /// To-many: no related row matches
    None,
}

/// A typed filter over rows of one model
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Scalar {
        column: Column,
        condition: ScalarCondition,
    },
    Relation {
        relation: Relation,
        quantifier: Quantifier,
        inner: Box<Predicate>,
    },
    /// Conjunction; empty matches every row
    And(Vec<Predicate>),
    /// Disjunction; empty matches no row
    Or(Vec<Predicate>),
    /// None of the listed predicates may hold; empty matches every row
    Not(Vec<Predicate>),
}

impl Predicate {
    /// A predicate that matches every row
    pub fn everything() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    /// `published = <value>` on articles
    pub fn published(value: bool) -> Self {
        Predicate::Scalar {
            column: schema::ARTICLE_PUBLISHED,
            condition: ScalarCondition::Compare {
                op: ScalarOp::Equals,
                value: ScalarValue::Bool(value),
            },
        }
    }
}

/// Sort direction for `orderBy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `orderBy` entry over an article column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: Column,
    pub direction: SortDirection,
}

/// Relations to load alongside each article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Include {
    pub created_by: bool,
    pub categories: bool,
}

/// Everything a "find many articles" call accepts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindArgs {
    /// Row filter; `None` matches every article
    pub filter: Option<Predicate>,
    pub order_by: Vec<OrderBy>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
    pub include: Include,
}

impl FindArgs {
    /// Find arguments with only a row filter
    pub fn with_filter(filter: Predicate) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }
}

/// Reasons a caller filter cannot be turned into a query
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("expected an object for `{0}`")]
    ExpectedObject(String),

    #[error("unknown field `{field}` on {model}")]
    UnknownField { model: &'static str, field: String },

    #[error("unknown operator `{operator}` for `{field}`")]
    UnknownOperator { field: String, operator: String },

    #[error("invalid value for `{field}`: expected {expected}")]
    InvalidValue { field: String, expected: &'static str },

    #[error("unknown argument `{0}`")]
    UnknownArgument(String),

    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument { argument: &'static str, reason: String },

    #[error("no filter was supplied")]
    MissingFilter,
}
