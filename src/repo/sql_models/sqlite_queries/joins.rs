use log::trace;

use crate::{
    query,
    repo::{
        self, Error,
        sql_models::{Record, record::cast_record},
    },
};

use super::{builders, records};

/// Joins `left` with `right` on every `on` pair and returns the projected rows.
///
/// An empty projection list selects every column of both tables.
pub async fn records_join(
    exe: &mut impl repo::AsExec,
    left: &str,
    right: &str,
    on: &[query::JoinOn],
    projections: &[query::Projection],
    filter: &query::Filter,
) -> Result<Vec<Record>, Error> {
    trace!("joining `{}` with `{}`", left, right);
    let (sql, values) = builders::build_join(left, right, on, projections, filter)?;
    records::fetch_rows(exe, &sql, values)
        .await?
        .into_iter()
        .map(cast_record)
        .collect()
}
