//! Builders of the SQL statements issued by the model helpers.
//!
//! Each builder returns the statement text together with the values to bind, in
//! placeholder order. Identifiers are validated, values are always bound.

use crate::query;

use super::SqliteQueryCompiler;

type Statement = (String, Vec<query::Value>);

fn compile_filter(
    filter: &query::Filter,
    compiler: &mut SqliteQueryCompiler,
) -> Result<query::CompilerResult, query::Error> {
    query::ClausesCompiler::new().filter(filter, compiler).compile()
}

fn projection_list(projections: &[query::Projection]) -> Result<String, query::Error> {
    if projections.is_empty() {
        return Err(query::Error::input("at least one projection is required"));
    }
    let items = projections
        .iter()
        .map(query::Projection::sql)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(", "))
}

fn column_list(columns: &[query::Column]) -> Result<String, query::Error> {
    let items = columns
        .iter()
        .map(|c| c.sql())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(", "))
}

/// Appends `GROUP BY`, `ORDER BY`, `LIMIT` and `OFFSET` to `sql`.
fn push_tail(sql: &mut String, select: &query::Select) -> Result<(), query::Error> {
    if !select.group_by.is_empty() {
        sql.push_str(&format!(" GROUP BY {}", column_list(&select.group_by)?));
    }

    if !select.order_by.is_empty() {
        let items = select
            .order_by
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    query::Direction::Asc => "ASC",
                    query::Direction::Desc => "DESC",
                };
                o.column.sql().map(|c| format!("{c} {dir}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        sql.push_str(&format!(" ORDER BY {}", items.join(", ")));
    }

    match (select.limit, select.offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        // SQLite only accepts OFFSET after a LIMIT, a negative limit means no limit
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }

    Ok(())
}

pub fn build_insert(
    table: &str,
    columns: &[&str],
    values: Vec<query::Value>,
) -> Result<Statement, query::Error> {
    let table = query::validate_identifier(table)?;
    if columns.is_empty() {
        return Err(query::Error::input("a model must declare at least one column"));
    }
    if columns.len() != values.len() {
        return Err(query::Error::input(format!(
            "`{table}` declares {} columns but provided {} values",
            columns.len(),
            values.len()
        )));
    }

    let names = columns
        .iter()
        .map(|c| query::validate_identifier(c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut compiler = SqliteQueryCompiler::new();
    let placeholders: Vec<String> = names.iter().map(|_| compiler.consume_placeholder()).collect();

    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, values))
}

pub fn build_update(
    table: &str,
    assignments: &query::Assignments,
    filter: &query::Filter,
) -> Result<Statement, query::Error> {
    let table = query::validate_identifier(table)?;
    if assignments.is_empty() {
        return Err(query::Error::input("update requires at least one assignment"));
    }

    let mut compiler = SqliteQueryCompiler::new();
    let mut values = Vec::with_capacity(assignments.len());
    let mut sets = Vec::with_capacity(assignments.len());
    for (column, value) in assignments.iter() {
        sets.push(format!("{} = {}", column.sql()?, compiler.consume_placeholder()));
        values.push(value.clone());
    }

    let qr = compile_filter(filter, &mut compiler)?;
    values.extend(qr.values.iter().cloned());

    let sql = format!("UPDATE {table} SET {}{}", sets.join(", "), qr.where_clause());
    Ok((sql, values))
}

pub fn build_delete(table: &str, filter: &query::Filter) -> Result<Statement, query::Error> {
    let table = query::validate_identifier(table)?;
    let qr = compile_filter(filter, &mut SqliteQueryCompiler::new())?;
    let sql = format!("DELETE FROM {table}{}", qr.where_clause());
    Ok((sql, qr.values))
}

pub fn build_select(
    table: &str,
    projections: &[query::Projection],
    select: &query::Select,
) -> Result<Statement, query::Error> {
    let table = query::validate_identifier(table)?;
    let items = projection_list(projections)?;
    let qr = compile_filter(&select.filter, &mut SqliteQueryCompiler::new())?;

    let mut sql = format!("SELECT {items} FROM {table}{}", qr.where_clause());
    push_tail(&mut sql, select)?;
    Ok((sql, qr.values))
}

pub fn build_aggregate(
    table: &str,
    func: query::AggFn,
    columns: &[query::Column],
    filter: &query::Filter,
) -> Result<Statement, query::Error> {
    let projections: Vec<query::Projection> = columns
        .iter()
        .map(|c| query::Projection::Aggregate(func, c.clone()))
        .collect();
    build_select(
        table,
        &projections,
        &query::Select::new().filter(filter.clone()),
    )
}

pub fn build_count(
    table: &str,
    columns: &[query::Column],
    filter: &query::Filter,
    distinct: bool,
) -> Result<Statement, query::Error> {
    let table = query::validate_identifier(table)?;
    if columns.is_empty() {
        return Err(query::Error::input("count requires at least one column"));
    }

    let names = column_list(columns)?;
    let qr = compile_filter(filter, &mut SqliteQueryCompiler::new())?;
    let where_clause = qr.where_clause();

    let sql = match (distinct, columns.len()) {
        (true, 1) => format!("SELECT COUNT(DISTINCT {names}) FROM {table}{where_clause}"),
        (true, _) => {
            format!("SELECT COUNT(*) FROM (SELECT DISTINCT {names} FROM {table}{where_clause})")
        }
        (false, _) => format!("SELECT COUNT(*) FROM (SELECT {names} FROM {table}{where_clause})"),
    };
    Ok((sql, qr.values))
}

pub fn build_join(
    left: &str,
    right: &str,
    on: &[query::JoinOn],
    projections: &[query::Projection],
    filter: &query::Filter,
) -> Result<Statement, query::Error> {
    let left = query::validate_identifier(left)?;
    let right = query::validate_identifier(right)?;
    if on.is_empty() {
        return Err(query::Error::input("join requires at least one join condition"));
    }

    let conditions = on
        .iter()
        .map(|j| Ok(format!("{} = {}", j.left.sql()?, j.right.sql()?)))
        .collect::<Result<Vec<_>, query::Error>>()?;

    let items = if projections.is_empty() {
        "*".to_string()
    } else {
        projection_list(projections)?
    };

    let qr = compile_filter(filter, &mut SqliteQueryCompiler::new())?;

    let sql = format!(
        "SELECT {items} FROM {left} JOIN {right} ON {}{}",
        conditions.join(" AND "),
        qr.where_clause()
    );
    Ok((sql, qr.values))
}
