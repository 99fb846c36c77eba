use crate::query;

/// Compiles conditions into SQLite clauses with numbered `?N` placeholders.
pub struct SqliteQueryCompiler {
    placeholder_counter: usize,
}

impl SqliteQueryCompiler {
    pub fn new() -> Self {
        Self {
            placeholder_counter: 1,
        }
    }

    pub fn consume_placeholder(&mut self) -> String {
        let p = format!("?{}", self.placeholder_counter);
        self.placeholder_counter += 1;
        p
    }
}

/// Escapes the `LIKE` wildcards of `text`, to be matched with `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl query::CompileClause for SqliteQueryCompiler {
    fn compile_clause<V>(
        &mut self,
        field: &str,
        op: query::Op<V>,
    ) -> Result<query::CompiledClause, query::Error>
    where
        V: Into<query::Value> + query::IsSupportedOp,
    {
        if !op.is_supported_op() {
            return Err(query::Error::unsupported_op(field.to_string()));
        }

        let r = match op {
            query::Op::Eq(v) => {
                let v: query::Value = v.into();
                query::CompiledClause::new(
                    format!("{field} = {}", self.consume_placeholder()),
                    vec![v],
                )
            }
            query::Op::Neq(v) => {
                let v: query::Value = v.into();
                query::CompiledClause::new(
                    format!("{field} != {}", self.consume_placeholder()),
                    vec![v],
                )
            }
            query::Op::Leq(v) => {
                let v: query::Value = v.into();
                query::CompiledClause::new(
                    format!("{field} <= {}", self.consume_placeholder()),
                    vec![v],
                )
            }
            query::Op::Geq(v) => {
                let v: query::Value = v.into();
                query::CompiledClause::new(
                    format!("{field} >= {}", self.consume_placeholder()),
                    vec![v],
                )
            }
            query::Op::Lt(v) => {
                let v: query::Value = v.into();
                query::CompiledClause::new(
                    format!("{field} < {}", self.consume_placeholder()),
                    vec![v],
                )
            }
            query::Op::Gt(v) => {
                let v: query::Value = v.into();
                query::CompiledClause::new(
                    format!("{field} > {}", self.consume_placeholder()),
                    vec![v],
                )
            }
            query::Op::Ex => {
                query::CompiledClause::new(format!("({field}) IS NOT NULL"), Vec::new())
            }
            query::Op::Nex => query::CompiledClause::new(format!("({field}) IS NULL"), Vec::new()),
            query::Op::Between(range) => {
                let min: query::Value = range.min.into();
                let max: query::Value = range.max.into();

                let pmin = self.consume_placeholder();
                let pmax = self.consume_placeholder();

                let clause = format!("({field} >= {pmin}) AND ({field} <= {pmax})");

                query::CompiledClause::new(clause, vec![min, max])
            }
            query::Op::In(items) => {
                if items.is_empty() {
                    return Ok(query::CompiledClause::never());
                }

                let values: Vec<query::Value> = items.into_iter().map(Into::into).collect();
                let placeholders: Vec<String> =
                    values.iter().map(|_| self.consume_placeholder()).collect();

                let clause = format!("{} IN ({})", field, placeholders.join(", "));

                query::CompiledClause::new(clause, values)
            }
            query::Op::Match(v) => {
                let value: query::Value = v.into();
                if let query::Value::Text(text) = value {
                    let value = query::Value::Text(format!("%{}%", escape_like(&text)));
                    let clause = format!(
                        "{} LIKE {} ESCAPE '\\'",
                        field,
                        self.consume_placeholder()
                    );
                    query::CompiledClause::new(clause, vec![value])
                } else {
                    return Err(query::Error::unsupported_op(field.to_string()));
                }
            }
        };

        Ok(r)
    }
}
