use crate::types::RowValues;

/// How a clause joins the clause before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl Operator {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
        }
    }
}

/// A single predicate term.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column <op> value`; `Eq`/`NotEq` against `Null` render as `IS [NOT] NULL`.
    Compare {
        column: String,
        op: Operator,
        value: RowValues,
    },
    /// `column IN (...)`; an empty list matches nothing.
    In {
        column: String,
        values: Vec<RowValues>,
    },
    /// Raw SQL fragment with its own `$N` / `?N` / `?` placeholders.
    Raw {
        sql: String,
        params: Vec<RowValues>,
    },
    /// Parenthesised sub-clause.
    Group(WhereClause),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Condition::compare(column, Operator::Eq, value)
    }

    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<RowValues>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column LIKE pattern`; the pattern is bound as a parameter, wildcards included.
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Condition::compare(column, Operator::Like, pattern.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::compare(column, Operator::Eq, RowValues::Null)
    }

    pub fn any_of<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn raw(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Condition::Raw {
            sql: sql.into(),
            params,
        }
    }
}

/// One term of a [`WhereClause`] with the conjunction joining it to the previous term.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub conjunction: Conjunction,
    pub condition: Condition,
}

/// An ordered list of predicate terms, rendered left to right.
///
/// The conjunction of the first rendered term is ignored; empty groups render
/// as nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    clauses: Vec<Clause>,
}

/// A normalized filter, ready to be merged into a query's `WHERE`.
pub type Predicate = WhereClause;

impl WhereClause {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when rendering would produce no SQL at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.iter().all(|clause| match &clause.condition {
            Condition::Group(inner) => inner.is_empty(),
            _ => false,
        })
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn push(&mut self, conjunction: Conjunction, condition: Condition) -> &mut Self {
        self.clauses.push(Clause {
            conjunction,
            condition,
        });
        self
    }

    pub fn and_where(&mut self, condition: Condition) -> &mut Self {
        self.push(Conjunction::And, condition)
    }

    pub fn or_where(&mut self, condition: Condition) -> &mut Self {
        self.push(Conjunction::Or, condition)
    }

    pub fn where_eq(
        &mut self,
        column: impl Into<String>,
        value: impl Into<RowValues>,
    ) -> &mut Self {
        self.and_where(Condition::eq(column, value))
    }

    pub fn or_where_eq(
        &mut self,
        column: impl Into<String>,
        value: impl Into<RowValues>,
    ) -> &mut Self {
        self.or_where(Condition::eq(column, value))
    }

    pub fn where_like(
        &mut self,
        column: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        self.and_where(Condition::like(column, pattern))
    }

    pub fn or_where_like(
        &mut self,
        column: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        self.or_where(Condition::like(column, pattern))
    }

    /// AND a parenthesised group built by `build`.
    pub fn and_where_group(&mut self, build: impl FnOnce(&mut WhereClause)) -> &mut Self {
        let mut group = WhereClause::new();
        build(&mut group);
        self.and_where(Condition::Group(group))
    }

    /// OR a parenthesised group built by `build`.
    pub fn or_where_group(&mut self, build: impl FnOnce(&mut WhereClause)) -> &mut Self {
        let mut group = WhereClause::new();
        build(&mut group);
        self.or_where(Condition::Group(group))
    }

    /// AND another clause list: spliced inline when it is AND-only, grouped otherwise.
    pub fn and_predicate(&mut self, predicate: WhereClause) -> &mut Self {
        if predicate.is_empty() {
            return self;
        }
        let and_only = predicate
            .clauses
            .iter()
            .skip(1)
            .all(|clause| clause.conjunction == Conjunction::And);
        if and_only {
            for clause in predicate.clauses {
                self.and_where(clause.condition);
            }
            self
        } else {
            self.and_where(Condition::Group(predicate))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_groups_count_as_empty() {
        let mut clause = WhereClause::new();
        assert!(clause.is_empty());
        clause.and_where_group(|_| {});
        assert!(clause.is_empty());
        clause.where_eq("id", 1);
        assert!(!clause.is_empty());
    }

    #[test]
    fn and_predicate_splices_or_groups() {
        let mut inline = WhereClause::new();
        inline.where_eq("a", 1).where_eq("b", 2);
        let mut target = WhereClause::new();
        target.and_predicate(inline);
        assert_eq!(target.clauses().len(), 2);

        let mut mixed = WhereClause::new();
        mixed.where_eq("a", 1).or_where_eq("b", 2);
        let mut target = WhereClause::new();
        target.and_predicate(mixed);
        assert_eq!(target.clauses().len(), 1);
        assert!(matches!(target.clauses()[0].condition, Condition::Group(_)));
    }
}
