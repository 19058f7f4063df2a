//! Predicate tree → parameterised SQL
//!
//! Identifiers come from the static schema only; every caller value is
//! pushed onto the parameter list and referenced with a `?` placeholder,
//! which both SQLite and MySQL accept.

use crate::config::DatabaseDriver;

use super::schema::{Join, Relation};
use super::{FindArgs, Predicate, Quantifier, ScalarCondition, ScalarOp, ScalarValue};

/// Columns selected for an article row, in the order the row mappers read them
pub const ARTICLE_COLUMNS: &str = "t0.id, t0.title, t0.body, t0.published, t0.created_by_id";

const TRUE_SQL: &str = "1 = 1";
const FALSE_SQL: &str = "1 = 0";

/// SQL text plus the values bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<ScalarValue>,
}

/// Compile a predicate over rows aliased as `alias`
pub fn compile_where(driver: DatabaseDriver, predicate: &Predicate, alias: &str) -> SqlFragment {
    let mut compiler = Compiler::new(driver);
    let sql = compiler.predicate(predicate, alias);
    SqlFragment {
        sql,
        params: compiler.params,
    }
}

/// Compile a full article query
pub fn compile_find(driver: DatabaseDriver, args: &FindArgs) -> SqlFragment {
    let mut compiler = Compiler::new(driver);
    let mut sql = format!("SELECT {} FROM articles t0", ARTICLE_COLUMNS);

    if let Some(filter) = &args.filter {
        let condition = compiler.predicate(filter, "t0");
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }

    let mut order: Vec<String> = args
        .order_by
        .iter()
        .map(|o| format!("t0.{} {}", o.column.column, o.direction.as_sql()))
        .collect();
    if !args.order_by.iter().any(|o| o.column.column == "id") {
        order.push("t0.id ASC".to_string());
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(&order.join(", "));

    match (args.take, args.skip) {
        (Some(take), Some(skip)) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            compiler.params.push(ScalarValue::Int(take));
            compiler.params.push(ScalarValue::Int(skip));
        }
        (Some(take), None) => {
            sql.push_str(" LIMIT ?");
            compiler.params.push(ScalarValue::Int(take));
        }
        (None, Some(skip)) => {
            // Neither dialect accepts OFFSET without LIMIT.
            let unbounded = match driver {
                DatabaseDriver::Sqlite => "-1",
                DatabaseDriver::Mysql => "18446744073709551615",
            };
            sql.push_str(&format!(" LIMIT {} OFFSET ?", unbounded));
            compiler.params.push(ScalarValue::Int(skip));
        }
        (None, None) => {}
    }

    SqlFragment {
        sql,
        params: compiler.params,
    }
}

struct Compiler {
    driver: DatabaseDriver,
    params: Vec<ScalarValue>,
    next_alias: usize,
}

impl Compiler {
    fn new(driver: DatabaseDriver) -> Self {
        Self {
            driver,
            params: Vec::new(),
            next_alias: 1,
        }
    }

    fn fresh_alias(&mut self) -> usize {
        let n = self.next_alias;
        self.next_alias += 1;
        n
    }

    fn predicate(&mut self, predicate: &Predicate, alias: &str) -> String {
        match predicate {
            Predicate::Scalar { column, condition } => {
                let target = format!("{}.{}", alias, column.column);
                self.condition(&target, condition)
            }
            Predicate::Relation {
                relation,
                quantifier,
                inner,
            } => self.relation(relation, *quantifier, inner, alias),
            Predicate::And(list) => self.join_list(list, alias, " AND ", TRUE_SQL),
            Predicate::Or(list) => self.join_list(list, alias, " OR ", FALSE_SQL),
            Predicate::Not(list) if list.is_empty() => TRUE_SQL.to_string(),
            Predicate::Not(list) => {
                let any = self.join_list(list, alias, " OR ", FALSE_SQL);
                format!("NOT ({})", any)
            }
        }
    }

    fn join_list(&mut self, list: &[Predicate], alias: &str, separator: &str, empty: &str) -> String {
        if list.is_empty() {
            return empty.to_string();
        }
        let parts: Vec<String> = list
            .iter()
            .map(|p| format!("({})", self.predicate(p, alias)))
            .collect();
        parts.join(separator)
    }

    fn condition(&mut self, target: &str, condition: &ScalarCondition) -> String {
        match condition {
            ScalarCondition::Compare { op, value } => self.compare(target, *op, value),
            ScalarCondition::In(values) if values.is_empty() => FALSE_SQL.to_string(),
            ScalarCondition::In(values) => {
                format!("{} IN ({})", target, self.placeholders(values))
            }
            ScalarCondition::NotIn(values) if values.is_empty() => TRUE_SQL.to_string(),
            ScalarCondition::NotIn(values) => {
                format!("{} NOT IN ({})", target, self.placeholders(values))
            }
            ScalarCondition::Not(inner) => format!("NOT ({})", self.condition(target, inner)),
            ScalarCondition::All(list) if list.is_empty() => TRUE_SQL.to_string(),
            ScalarCondition::All(list) => {
                let parts: Vec<String> = list
                    .iter()
                    .map(|c| format!("({})", self.condition(target, c)))
                    .collect();
                parts.join(" AND ")
            }
        }
    }

    fn compare(&mut self, target: &str, op: ScalarOp, value: &ScalarValue) -> String {
        let symbol = match op {
            ScalarOp::Equals => "=",
            ScalarOp::Lt => "<",
            ScalarOp::Lte => "<=",
            ScalarOp::Gt => ">",
            ScalarOp::Gte => ">=",
            ScalarOp::Contains | ScalarOp::StartsWith | ScalarOp::EndsWith => {
                return self.like(target, op, value);
            }
        };
        self.params.push(value.clone());
        format!("{} {} ?", target, symbol)
    }

    fn like(&mut self, target: &str, op: ScalarOp, value: &ScalarValue) -> String {
        let text = match value {
            ScalarValue::Text(s) => s.as_str(),
            // The parser only admits text operands for text operators.
            _ => return FALSE_SQL.to_string(),
        };
        let pattern = match op {
            ScalarOp::Contains => format!("%{}%", text),
            ScalarOp::StartsWith => format!("{}%", text),
            _ => format!("%{}", text),
        };
        self.params.push(ScalarValue::Text(pattern));

        let escape = match self.driver {
            DatabaseDriver::Sqlite => r"'\'",
            DatabaseDriver::Mysql => r"'\\'",
        };
        format!("{} LIKE ? ESCAPE {}", target, escape)
    }

    fn placeholders(&mut self, values: &[ScalarValue]) -> String {
        self.params.extend(values.iter().cloned());
        vec!["?"; values.len()].join(", ")
    }

    fn relation(
        &mut self,
        relation: &Relation,
        quantifier: Quantifier,
        inner: &Predicate,
        alias: &str,
    ) -> String {
        let n = self.fresh_alias();
        let target_alias = format!("t{}", n);
        let target_table = relation.target.table();

        let (from, correlation) = match relation.join {
            Join::Owner { fk } => (
                format!("{} {}", target_table, target_alias),
                format!("{}.id = {}.{}", target_alias, alias, fk),
            ),
            Join::Owned { fk } => (
                format!("{} {}", target_table, target_alias),
                format!("{}.{} = {}.id", target_alias, fk, alias),
            ),
            Join::Link {
                table,
                source_key,
                target_key,
            } => {
                let link_alias = format!("l{}", n);
                (
                    format!(
                        "{} {} JOIN {} {} ON {}.id = {}.{}",
                        table, link_alias, target_table, target_alias, target_alias, link_alias,
                        target_key
                    ),
                    format!("{}.{} = {}.id", link_alias, source_key, alias),
                )
            }
        };

        let inner_sql = self.predicate(inner, &target_alias);
        let (negated, matcher) = match quantifier {
            Quantifier::Is | Quantifier::Some => (false, inner_sql),
            Quantifier::IsNot | Quantifier::None => (true, inner_sql),
            // No related row may fail the inner filter.
            Quantifier::Every => (true, format!("NOT ({})", inner_sql)),
        };

        format!(
            "{}EXISTS (SELECT 1 FROM {} WHERE {} AND ({}))",
            if negated { "NOT " } else { "" },
            from,
            correlation,
            matcher
        )
    }
}
