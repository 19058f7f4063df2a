//! JSON → predicate tree
//!
//! The accepted shape follows the familiar ORM "where input" style:
//!
//! ```text
//! { "title": { "startsWith": "a" },
//!   "createdBy": { "name": "karen" },
//!   "categories": { "some": { "name": "blog" } },
//!   "OR": [ { "id": 1 }, { "id": { "gt": 50 } } ] }
//! ```

use serde_json::{Map, Value};

use super::schema::{Cardinality, Column, Field, Model, Relation, ScalarKind};
use super::{
    FilterError, FindArgs, Include, OrderBy, Predicate, Quantifier, ScalarCondition, ScalarOp,
    ScalarValue, SortDirection,
};

/// How scalar leaves are decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScalarDecoding {
    /// JSON types must match the column type
    #[default]
    Strict,
    /// Strings are also accepted for integer and boolean columns
    /// (every leaf of a decoded query string is a string)
    Lenient,
}

/// Parser for caller filters
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser {
    decoding: ScalarDecoding,
}

impl Parser {
    pub fn new(decoding: ScalarDecoding) -> Self {
        Self { decoding }
    }

    pub fn strict() -> Self {
        Self::new(ScalarDecoding::Strict)
    }

    pub fn lenient() -> Self {
        Self::new(ScalarDecoding::Lenient)
    }

    /// Parse a where object for `model`
    pub fn parse_where(&self, model: Model, value: &Value) -> Result<Predicate, FilterError> {
        let object = value
            .as_object()
            .ok_or_else(|| FilterError::ExpectedObject(model.name().to_string()))?;

        let mut predicates = Vec::with_capacity(object.len());
        for (key, value) in object {
            predicates.push(self.parse_entry(model, key, value)?);
        }

        if predicates.len() == 1 {
            Ok(predicates.remove(0))
        } else {
            Ok(Predicate::And(predicates))
        }
    }

    /// Parse a full argument object (`where`, `orderBy`, `take`, `skip`, `include`)
    pub fn parse_find_args(&self, value: &Value) -> Result<FindArgs, FilterError> {
        let object = match value {
            Value::Null => return Ok(FindArgs::default()),
            Value::Object(object) => object,
            _ => return Err(FilterError::ExpectedObject("arguments".to_string())),
        };

        let mut args = FindArgs::default();
        for (key, value) in object {
            match key.as_str() {
                "where" => {
                    if !value.is_null() {
                        args.filter = Some(self.parse_where(Model::Article, value)?);
                    }
                }
                "orderBy" => args.order_by = parse_order_by(value)?,
                "take" => args.take = parse_count("take", value)?,
                "skip" => args.skip = parse_count("skip", value)?,
                "include" => args.include = parse_include(value)?,
                other => return Err(FilterError::UnknownArgument(other.to_string())),
            }
        }

        Ok(args)
    }

    fn parse_entry(&self, model: Model, key: &str, value: &Value) -> Result<Predicate, FilterError> {
        match key {
            "AND" => Ok(Predicate::And(self.parse_where_list(model, key, value)?)),
            "OR" => Ok(Predicate::Or(self.parse_where_list(model, key, value)?)),
            "NOT" => Ok(Predicate::Not(self.parse_where_list(model, key, value)?)),
            _ => match model.field(key) {
                Some(Field::Scalar(column)) => Ok(Predicate::Scalar {
                    column,
                    condition: self.parse_scalar_condition(column, value)?,
                }),
                Some(Field::Relation(relation)) => self.parse_relation(relation, value),
                None => Err(FilterError::UnknownField {
                    model: model.name(),
                    field: key.to_string(),
                }),
            },
        }
    }

    /// `AND`/`OR`/`NOT` accept a single object or a list of objects
    fn parse_where_list(
        &self,
        model: Model,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Predicate>, FilterError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.parse_where(model, item))
                .collect(),
            Value::Object(_) => Ok(vec![self.parse_where(model, value)?]),
            _ => Err(FilterError::ExpectedObject(key.to_string())),
        }
    }

    fn parse_relation(&self, relation: Relation, value: &Value) -> Result<Predicate, FilterError> {
        let object = value
            .as_object()
            .ok_or_else(|| FilterError::ExpectedObject(relation.field.to_string()))?;

        let quantified = |quantifier: Quantifier, inner: &Value| -> Result<Predicate, FilterError> {
            Ok(Predicate::Relation {
                relation,
                quantifier,
                inner: Box::new(self.parse_where(relation.target, inner)?),
            })
        };

        let mut predicates = Vec::new();
        match relation.cardinality {
            Cardinality::ToOne => {
                let explicit = object.contains_key("is") || object.contains_key("isNot");
                if !explicit {
                    // A bare where object is shorthand for `is`.
                    return quantified(Quantifier::Is, value);
                }
                for (key, inner) in object {
                    let quantifier = match key.as_str() {
                        "is" => Quantifier::Is,
                        "isNot" => Quantifier::IsNot,
                        other => return Err(unknown_operator(relation.field, other)),
                    };
                    predicates.push(quantified(quantifier, inner)?);
                }
            }
            Cardinality::ToMany => {
                for (key, inner) in object {
                    let quantifier = match key.as_str() {
                        "some" => Quantifier::Some,
                        "every" => Quantifier::Every,
                        "none" => Quantifier::None,
                        other => return Err(unknown_operator(relation.field, other)),
                    };
                    predicates.push(quantified(quantifier, inner)?);
                }
            }
        }

        if predicates.len() == 1 {
            Ok(predicates.remove(0))
        } else {
            Ok(Predicate::And(predicates))
        }
    }

    fn parse_scalar_condition(
        &self,
        column: Column,
        value: &Value,
    ) -> Result<ScalarCondition, FilterError> {
        let Some(object) = value.as_object() else {
            return Ok(ScalarCondition::Compare {
                op: ScalarOp::Equals,
                value: self.decode(column, value)?,
            });
        };

        let mut conditions = Vec::with_capacity(object.len());
        for (key, operand) in object {
            conditions.push(self.parse_scalar_operator(column, key, operand)?);
        }

        if conditions.len() == 1 {
            Ok(conditions.remove(0))
        } else {
            Ok(ScalarCondition::All(conditions))
        }
    }

    fn parse_scalar_operator(
        &self,
        column: Column,
        operator: &str,
        operand: &Value,
    ) -> Result<ScalarCondition, FilterError> {
        let compare = |op: ScalarOp| -> Result<ScalarCondition, FilterError> {
            Ok(ScalarCondition::Compare {
                op,
                value: self.decode(column, operand)?,
            })
        };
        let ordered = column.kind != ScalarKind::Bool;
        let textual = column.kind == ScalarKind::Text;

        match operator {
            "equals" => compare(ScalarOp::Equals),
            "not" => {
                let inner = if operand.is_object() {
                    self.parse_scalar_condition(column, operand)?
                } else {
                    compare(ScalarOp::Equals)?
                };
                Ok(ScalarCondition::Not(Box::new(inner)))
            }
            "in" => Ok(ScalarCondition::In(self.decode_list(column, operand)?)),
            "notIn" => Ok(ScalarCondition::NotIn(self.decode_list(column, operand)?)),
            "lt" if ordered => compare(ScalarOp::Lt),
            "lte" if ordered => compare(ScalarOp::Lte),
            "gt" if ordered => compare(ScalarOp::Gt),
            "gte" if ordered => compare(ScalarOp::Gte),
            "contains" if textual => compare(ScalarOp::Contains),
            "startsWith" if textual => compare(ScalarOp::StartsWith),
            "endsWith" if textual => compare(ScalarOp::EndsWith),
            other => Err(unknown_operator(column.field, other)),
        }
    }

    fn decode_list(&self, column: Column, value: &Value) -> Result<Vec<ScalarValue>, FilterError> {
        match value {
            Value::Array(items) => items.iter().map(|item| self.decode(column, item)).collect(),
            single => Ok(vec![self.decode(column, single)?]),
        }
    }

    fn decode(&self, column: Column, value: &Value) -> Result<ScalarValue, FilterError> {
        let lenient = self.decoding == ScalarDecoding::Lenient;
        let decoded = match (column.kind, value) {
            (ScalarKind::Int, Value::Number(n)) => n.as_i64().map(ScalarValue::Int),
            (ScalarKind::Int, Value::String(s)) if lenient => {
                s.trim().parse::<i64>().ok().map(ScalarValue::Int)
            }
            (ScalarKind::Text, Value::String(s)) => Some(ScalarValue::Text(s.clone())),
            (ScalarKind::Bool, Value::Bool(b)) => Some(ScalarValue::Bool(*b)),
            (ScalarKind::Bool, Value::String(s)) if lenient => match s.as_str() {
                "true" => Some(ScalarValue::Bool(true)),
                "false" => Some(ScalarValue::Bool(false)),
                _ => None,
            },
            _ => None,
        };

        decoded.ok_or_else(|| FilterError::InvalidValue {
            field: column.field.to_string(),
            expected: column.kind.as_str(),
        })
    }
}

fn unknown_operator(field: &str, operator: &str) -> FilterError {
    FilterError::UnknownOperator {
        field: field.to_string(),
        operator: operator.to_string(),
    }
}

/// `orderBy` is one `{field: direction}` object or a list of them
fn parse_order_by(value: &Value) -> Result<Vec<OrderBy>, FilterError> {
    let entries: Vec<&Map<String, Value>> = match value {
        Value::Object(object) => vec![object],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| FilterError::ExpectedObject("orderBy".to_string()))
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(FilterError::ExpectedObject("orderBy".to_string())),
    };

    entries
        .into_iter()
        .map(|entry| {
            // Key order inside one object is not meaningful, so allow exactly one.
            let mut fields = entry.iter();
            let (Some((field, direction)), None) = (fields.next(), fields.next()) else {
                return Err(FilterError::InvalidArgument {
                    argument: "orderBy",
                    reason: "each entry must name exactly one field".to_string(),
                });
            };
            let column = Model::Article.column(field).ok_or_else(|| FilterError::UnknownField {
                model: Model::Article.name(),
                field: field.clone(),
            })?;
            let direction = match direction.as_str() {
                Some("asc") => SortDirection::Asc,
                Some("desc") => SortDirection::Desc,
                _ => {
                    return Err(FilterError::InvalidArgument {
                        argument: "orderBy",
                        reason: format!("direction for `{}` must be \"asc\" or \"desc\"", field),
                    })
                }
            };
            Ok(OrderBy { column, direction })
        })
        .collect()
}

fn parse_count(argument: &'static str, value: &Value) -> Result<Option<i64>, FilterError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_i64() {
            Some(count) if count >= 0 => Ok(Some(count)),
            _ => Err(FilterError::InvalidArgument {
                argument,
                reason: "must be a non-negative integer".to_string(),
            }),
        },
        _ => Err(FilterError::InvalidArgument {
            argument,
            reason: "must be a non-negative integer".to_string(),
        }),
    }
}

fn parse_include(value: &Value) -> Result<Include, FilterError> {
    let object = value
        .as_object()
        .ok_or_else(|| FilterError::ExpectedObject("include".to_string()))?;

    let mut include = Include::default();
    for (key, flag) in object {
        let flag = flag.as_bool().ok_or_else(|| FilterError::InvalidArgument {
            argument: "include",
            reason: format!("`{}` must be a boolean", key),
        })?;
        match key.as_str() {
            "createdBy" => include.created_by = flag,
            "categories" => include.categories = flag,
            other => {
                return Err(FilterError::UnknownField {
                    model: Model::Article.name(),
                    field: other.to_string(),
                })
            }
        }
    }

    Ok(include)
}
