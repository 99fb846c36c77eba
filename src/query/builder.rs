use super::{Error, Filter, IsSupportedOp, Op, Value};

/// Clause that never matches, used for an empty `IN` set.
const FALSE_CLAUSE: &str = "0 = 1";

pub struct CompiledClause {
    pub clause: String,
    pub values: Vec<Value>,
}

impl CompiledClause {
    pub fn new(clause: String, values: Vec<Value>) -> Self {
        Self { clause, values }
    }

    pub fn never() -> Self {
        Self {
            clause: FALSE_CLAUSE.to_string(),
            values: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.clause, self.values)
    }
}

pub trait CompileClause {
    fn compile_clause<V>(&mut self, field: &str, op: Op<V>) -> Result<CompiledClause, Error>
    where
        V: Into<Value> + IsSupportedOp;
}

#[derive(Debug)]
pub struct CompilerResult {
    pub clauses: Vec<String>,
    pub values: Vec<Value>,
}

impl CompilerResult {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the ` WHERE ...` suffix joining every clause with `AND`, or an
    /// empty string when nothing is filtered.
    pub fn where_clause(&self) -> String {
        if self.is_unfiltered() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

pub struct ClausesCompiler {
    result: CompilerResult,
    error: Option<Error>,
}

impl Default for ClausesCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ClausesCompiler {
    pub fn new() -> Self {
        Self {
            result: CompilerResult::new(),
            error: None,
        }
    }

    pub fn expr<F, V>(mut self, field: &str, op: Op<V>, mapper: &mut F) -> Self
    where
        V: Into<Value> + IsSupportedOp,
        F: CompileClause,
    {
        if self.error.is_some() {
            return self;
        }

        match mapper.compile_clause(field, op) {
            Ok(compiled) => {
                let (clause, mut values) = compiled.into_parts();
                self.result.clauses.push(clause);
                self.result.values.append(&mut values);
            }
            Err(err) => self.error = Some(err),
        }

        self
    }

    /// Adds every condition of `filter`, validating the column names.
    pub fn filter<F>(mut self, filter: &Filter, mapper: &mut F) -> Self
    where
        F: CompileClause,
    {
        for cond in filter.iter() {
            if self.error.is_some() {
                break;
            }

            match cond.column.sql() {
                Ok(field) => self = self.expr(field, cond.op.clone(), mapper),
                Err(err) => self.error = Some(err),
            }
        }

        self
    }

    pub fn compile(self) -> Result<CompilerResult, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }
}
