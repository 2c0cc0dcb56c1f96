use crate::error::SqlAccessorError;
use crate::translation::{PlaceholderStyle, renumber_placeholders};
use crate::types::RowValues;

use super::condition::{Condition, Conjunction, Operator, WhereClause};
use super::ident::{quote_column, quote_ident};
use super::{Order, Statement, TableQuery};

/// Rendered SQL plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<RowValues>,
}

struct SqlWriter {
    sql: String,
    params: Vec<RowValues>,
    style: PlaceholderStyle,
}

impl SqlWriter {
    fn new(style: PlaceholderStyle) -> Self {
        Self {
            sql: String::with_capacity(128),
            params: Vec::new(),
            style,
        }
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    fn bind(&mut self, value: RowValues) {
        self.params.push(value);
        let placeholder = self.style.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    fn raw(&mut self, fragment: &str, params: &[RowValues]) -> Result<(), SqlAccessorError> {
        let renumbered = renumber_placeholders(fragment, self.style, self.params.len());
        if renumbered.max_index != params.len() {
            return Err(SqlAccessorError::ParameterError(format!(
                "raw fragment {fragment:?} references {} parameter(s) but {} were supplied",
                renumbered.max_index,
                params.len()
            )));
        }
        self.sql.push_str(&renumbered.sql);
        self.params.extend_from_slice(params);
        Ok(())
    }

    fn finish(self) -> CompiledQuery {
        CompiledQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

pub(super) fn compile(
    query: &TableQuery,
    limit_override: Option<i64>,
) -> Result<CompiledQuery, SqlAccessorError> {
    let mut w = SqlWriter::new(query.style);
    let table = quote_ident(&query.table)?;

    match &query.statement {
        Statement::Select { columns } => {
            w.push("SELECT ");
            if columns.is_empty() {
                w.push("*");
            } else {
                let rendered = columns
                    .iter()
                    .map(|c| quote_column(c))
                    .collect::<Result<Vec<_>, _>>()?;
                w.push(&rendered.join(", "));
            }
            w.push(" FROM ");
            w.push(&table);
            write_where(&mut w, &query.clauses)?;
            write_order(&mut w, &query.order)?;
            write_window(&mut w, limit_override.or(query.limit), query.offset);
        }
        Statement::Count { alias } => {
            w.push("SELECT count(*) AS ");
            w.push(&quote_ident(alias)?);
            w.push(" FROM ");
            w.push(&table);
            write_where(&mut w, &query.clauses)?;
            write_window(&mut w, limit_override.or(query.limit), query.offset);
        }
        Statement::Insert { columns, rows } => {
            w.push("INSERT INTO ");
            w.push(&table);
            if columns.is_empty() {
                if rows.len() != 1 {
                    return Err(SqlAccessorError::ExecutionError(
                        "multi-row insert needs at least one column".into(),
                    ));
                }
                w.push(" DEFAULT VALUES");
            } else {
                let rendered = columns
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect::<Result<Vec<_>, _>>()?;
                w.push(" (");
                w.push(&rendered.join(", "));
                w.push(") VALUES ");
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push("(");
                    for (j, value) in row.iter().enumerate() {
                        if j > 0 {
                            w.push(", ");
                        }
                        w.bind(value.clone());
                    }
                    w.push(")");
                }
            }
        }
        Statement::Update { assignments } => {
            if assignments.is_empty() {
                return Err(SqlAccessorError::ExecutionError(
                    "update called with no columns to set".into(),
                ));
            }
            w.push("UPDATE ");
            w.push(&table);
            w.push(" SET ");
            for (i, (column, value)) in assignments.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push(&quote_ident(column)?);
                w.push(" = ");
                w.bind(value.clone());
            }
            write_where(&mut w, &query.clauses)?;
        }
        Statement::Delete => {
            w.push("DELETE FROM ");
            w.push(&table);
            write_where(&mut w, &query.clauses)?;
        }
    }

    Ok(w.finish())
}

fn write_where(w: &mut SqlWriter, clauses: &WhereClause) -> Result<(), SqlAccessorError> {
    if clauses.is_empty() {
        return Ok(());
    }
    w.push(" WHERE ");
    write_clauses(w, clauses)
}

fn write_clauses(w: &mut SqlWriter, clauses: &WhereClause) -> Result<(), SqlAccessorError> {
    let mut first = true;
    for clause in clauses.clauses() {
        if let Condition::Group(inner) = &clause.condition
            && inner.is_empty()
        {
            continue;
        }
        if !first {
            w.push(match clause.conjunction {
                Conjunction::And => " AND ",
                Conjunction::Or => " OR ",
            });
        }
        first = false;
        write_condition(w, &clause.condition)?;
    }
    Ok(())
}

fn write_condition(w: &mut SqlWriter, condition: &Condition) -> Result<(), SqlAccessorError> {
    match condition {
        Condition::Compare { column, op, value } => {
            w.push(&quote_ident(column)?);
            match (op, value) {
                (Operator::Eq, RowValues::Null) => w.push(" IS NULL"),
                (Operator::NotEq, RowValues::Null) => w.push(" IS NOT NULL"),
                _ => {
                    w.push(" ");
                    w.push(op.as_sql());
                    w.push(" ");
                    w.bind(value.clone());
                }
            }
        }
        Condition::In { column, values } => {
            if values.is_empty() {
                w.push("1 = 0");
                return Ok(());
            }
            w.push(&quote_ident(column)?);
            w.push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.bind(value.clone());
            }
            w.push(")");
        }
        Condition::Raw { sql, params } => w.raw(sql, params)?,
        Condition::Group(inner) => {
            w.push("(");
            write_clauses(w, inner)?;
            w.push(")");
        }
    }
    Ok(())
}

fn write_order(w: &mut SqlWriter, order: &[(String, Order)]) -> Result<(), SqlAccessorError> {
    for (i, (column, direction)) in order.iter().enumerate() {
        w.push(if i == 0 { " ORDER BY " } else { ", " });
        w.push(&quote_ident(column)?);
        w.push(match direction {
            Order::Asc => " ASC",
            Order::Desc => " DESC",
        });
    }
    Ok(())
}

fn write_window(w: &mut SqlWriter, limit: Option<i64>, offset: Option<i64>) {
    match (limit, offset) {
        (Some(limit), _) => w.push(&format!(" LIMIT {limit}")),
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded there.
        (None, Some(_)) if w.style == PlaceholderStyle::Sqlite => w.push(" LIMIT -1"),
        (None, _) => {}
    }
    if let Some(offset) = offset {
        w.push(&format!(" OFFSET {offset}"));
    }
}
