use log::trace;

use crate::{
    query,
    repo::{self, Error, sql_models::record::cast_record},
};

use super::{builders, records};

/// Applies `func` to every column over the rows matching `filter`.
///
/// Returns one value per column, in order. A `NULL` aggregate (e.g. over no rows)
/// is returned as `0`.
pub async fn records_aggregate(
    exe: &mut impl repo::AsExec,
    table: &str,
    func: query::AggFn,
    columns: &[query::Column],
    filter: &query::Filter,
) -> Result<Vec<query::Value>, Error> {
    trace!("aggregating `{}` with {}", table, func.sql_name());
    let (sql, values) = builders::build_aggregate(table, func, columns, filter)?;
    let row = records::fetch_one_row(exe, &sql, values).await?;
    Ok(cast_record(row)?
        .into_values()
        .into_iter()
        .map(query::Value::or_zero)
        .collect())
}

/// Counts the rows matching `filter`, or the distinct tuples of `columns` when
/// `distinct` is set.
pub async fn records_count(
    exe: &mut impl repo::AsExec,
    table: &str,
    columns: &[query::Column],
    filter: &query::Filter,
    distinct: bool,
) -> Result<i64, Error> {
    trace!("counting `{}` (distinct: {})", table, distinct);
    let (sql, values) = builders::build_count(table, columns, filter, distinct)?;
    let row = records::fetch_one_row(exe, &sql, values).await?;
    records::first_integer(&row)
}
