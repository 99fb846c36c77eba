use log::{trace, warn};
use sqlx::{FromRow, Row, sqlite::SqliteRow};

use crate::{
    query,
    repo::{
        self, Error,
        sql_models::{Model, Record, record::cast_record},
    },
};

use super::builders;

type Arguments<'q> = <repo::Database as sqlx::Database>::Arguments<'q>;
type Query<'q> = sqlx::query::Query<'q, repo::Database, Arguments<'q>>;

/// Binds `values` in placeholder order.
pub(super) fn bind_values(mut q: Query<'_>, values: Vec<query::Value>) -> Query<'_> {
    for value in values {
        q = match value {
            query::Value::Null => q.bind(None::<i64>),
            query::Value::Integer(v) => q.bind(v),
            query::Value::Float(v) => q.bind(v),
            query::Value::Text(v) => q.bind(v),
            query::Value::Boolean(v) => q.bind(v),
            query::Value::Blob(v) => q.bind(v),
        };
    }
    q
}

pub(super) async fn fetch_rows(
    exe: &mut impl repo::AsExec,
    sql: &str,
    values: Vec<query::Value>,
) -> Result<Vec<SqliteRow>, Error> {
    Ok(bind_values(sqlx::query(sql), values)
        .fetch_all(exe.as_exec()?)
        .await?)
}

pub(super) async fn fetch_one_row(
    exe: &mut impl repo::AsExec,
    sql: &str,
    values: Vec<query::Value>,
) -> Result<SqliteRow, Error> {
    Ok(bind_values(sqlx::query(sql), values)
        .fetch_one(exe.as_exec()?)
        .await?)
}

async fn execute(
    exe: &mut impl repo::AsExec,
    sql: &str,
    values: Vec<query::Value>,
) -> Result<u64, Error> {
    let res = bind_values(sqlx::query(sql), values)
        .execute(exe.as_exec()?)
        .await?;
    Ok(res.rows_affected())
}

/// Inserts a single model.
pub async fn record_insert<M: Model>(exe: &mut impl repo::AsExec, model: &M) -> Result<(), Error> {
    trace!("inserting into `{}`", M::TABLE);
    let (sql, values) = builders::build_insert(M::TABLE, M::columns(), model.values())?;
    execute(exe, &sql, values).await?;
    Ok(())
}

/// Inserts every model, in order, returning how many rows were written.
pub async fn records_insert<M: Model>(
    exe: &mut impl repo::AsExec,
    models: &[M],
) -> Result<u64, Error> {
    trace!("inserting {} records into `{}`", models.len(), M::TABLE);
    let mut inserted = 0;
    for model in models {
        let (sql, values) = builders::build_insert(M::TABLE, M::columns(), model.values())?;
        inserted += execute(exe, &sql, values).await?;
    }
    Ok(inserted)
}

/// Updates the rows of `table` matching `filter`.
pub async fn records_update(
    exe: &mut impl repo::AsExec,
    table: &str,
    assignments: &query::Assignments,
    filter: &query::Filter,
) -> Result<u64, Error> {
    trace!("updating `{}`", table);
    let (sql, values) = builders::build_update(table, assignments, filter)?;
    execute(exe, &sql, values).await
}

/// Deletes the rows of `table` matching `filter`.
///
/// An empty filter deletes every row of the table.
pub async fn records_delete(
    exe: &mut impl repo::AsExec,
    table: &str,
    filter: &query::Filter,
) -> Result<u64, Error> {
    if filter.is_empty() {
        warn!("deleting every row of `{}`", table);
    } else {
        trace!("deleting from `{}`", table);
    }
    let (sql, values) = builders::build_delete(table, filter)?;
    execute(exe, &sql, values).await
}

pub async fn records_select(
    exe: &mut impl repo::AsExec,
    table: &str,
    projections: &[query::Projection],
    select: &query::Select,
) -> Result<Vec<Record>, Error> {
    trace!("selecting from `{}`", table);
    let (sql, values) = builders::build_select(table, projections, select)?;
    fetch_rows(exe, &sql, values)
        .await?
        .into_iter()
        .map(cast_record)
        .collect()
}

/// Reads whole models, decoded with their [`sqlx::FromRow`] implementation.
pub async fn models_select<M: Model>(
    exe: &mut impl repo::AsExec,
    select: &query::Select,
) -> Result<Vec<M>, Error> {
    trace!("selecting models from `{}`", M::TABLE);
    let (sql, values) = builders::build_select(M::TABLE, &[query::Projection::All], select)?;
    let rows = fetch_rows(exe, &sql, values).await?;
    Ok(rows
        .iter()
        .map(|row| M::from_row(row))
        .collect::<Result<Vec<_>, _>>()?)
}

/// Runs a raw statement, returning the number of affected rows.
///
/// `sql` is sent as is: it must not come from untrusted input.
pub async fn raw_execute(exe: &mut impl repo::AsExec, sql: &str) -> Result<u64, Error> {
    trace!("executing raw statement");
    let res = sqlx::raw_sql(sql).execute(exe.as_exec()?).await?;
    Ok(res.rows_affected())
}

/// Runs a raw query, returning the fetched rows.
pub async fn raw_fetch(exe: &mut impl repo::AsExec, sql: &str) -> Result<Vec<Record>, Error> {
    trace!("fetching raw query");
    sqlx::raw_sql(sql)
        .fetch_all(exe.as_exec()?)
        .await?
        .into_iter()
        .map(cast_record)
        .collect()
}

/// Reads the first column of `row` as an integer.
pub(super) fn first_integer(row: &SqliteRow) -> Result<i64, Error> {
    Ok(row.try_get::<i64, _>(0)?)
}
