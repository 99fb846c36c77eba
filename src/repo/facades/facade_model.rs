//! This module provides the high-level API for handling the records of a [`repo::Model`].
//!
//! The central type is the [`FacadeModel`], which exposes create, read, update,
//! delete, aggregate, join and pagination helpers for one model type. Every call is
//! a single unit of work: it acquires a session on the model's database, runs its
//! statements and then commits (writes) or simply releases the session (reads).
//! On any error the session is rolled back and the error is returned unchanged.

use std::marker::PhantomData;

use log::{debug, trace};

use crate::{
    query,
    repo::{self, Commit, Model, Record},
};

use super::FacadeError;

pub struct FacadeModel<M> {
    engines: repo::Engines,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for FacadeModel<M> {
    fn clone(&self) -> Self {
        Self {
            engines: self.engines.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> FacadeModel<M> {
    pub fn new(engines: repo::Engines) -> Self {
        Self {
            engines,
            _model: PhantomData,
        }
    }

    async fn scoped<T>(
        &self,
        commit: Commit,
        op: impl AsyncFnOnce(&mut repo::Session) -> Result<T, FacadeError>,
    ) -> Result<T, FacadeError> {
        repo::scoped(&self.engines, M::DATABASE, commit, op).await
    }

    /// Inserts `model` and commits.
    pub async fn add(&self, model: &M) -> Result<(), FacadeError> {
        self.scoped(Commit::Yes, async |s| {
            repo::record_insert(s, model).await?;
            Ok(())
        })
        .await
    }

    /// Inserts every model in a single transaction.
    ///
    /// Either all models are written or, if any insert fails, none of them is.
    pub async fn batch_add(&self, models: &[M]) -> Result<u64, FacadeError> {
        self.scoped(Commit::Yes, async |s| {
            Ok(repo::records_insert(s, models).await?)
        })
        .await
    }

    /// Deletes the rows matching `filter`, returning how many were removed.
    ///
    /// An empty filter deletes every row of the table.
    pub async fn delete(&self, filter: impl Into<query::Filter>) -> Result<u64, FacadeError> {
        let filter = filter.into();
        self.scoped(Commit::Yes, async |s| {
            Ok(repo::records_delete(s, M::TABLE, &filter).await?)
        })
        .await
    }

    /// Applies `assignments` to the rows matching `filter`, returning how many were
    /// changed.
    pub async fn update(
        &self,
        assignments: query::Assignments,
        filter: impl Into<query::Filter>,
    ) -> Result<u64, FacadeError> {
        let filter = filter.into();
        self.scoped(Commit::Yes, async |s| {
            Ok(repo::records_update(s, M::TABLE, &assignments, &filter).await?)
        })
        .await
    }

    /// Joins this model's table with the table of `O`.
    ///
    /// Both models must live in the same database. The joined rows are fully read
    /// before the session is released.
    pub async fn join<O: Model>(
        &self,
        on: &[query::JoinOn],
        projections: &[query::Projection],
        filter: impl Into<query::Filter>,
    ) -> Result<Vec<Record>, FacadeError> {
        if M::DATABASE != O::DATABASE {
            return Err(FacadeError::CrossDatabaseJoin {
                left: M::TABLE.to_string(),
                right: O::TABLE.to_string(),
            });
        }

        let filter = filter.into();
        self.scoped(Commit::Yes, async |s| {
            Ok(repo::records_join(s, M::TABLE, O::TABLE, on, projections, &filter).await?)
        })
        .await
    }

    /// Reads the projected rows selected by `select`.
    pub async fn query(
        &self,
        projections: &[query::Projection],
        select: query::Select,
    ) -> Result<Vec<Record>, FacadeError> {
        self.scoped(Commit::No, async |s| {
            Ok(repo::records_select(s, M::TABLE, projections, &select).await?)
        })
        .await
    }

    /// Reads the first projected row selected by `select`, if any.
    pub async fn first(
        &self,
        projections: &[query::Projection],
        select: query::Select,
    ) -> Result<Option<Record>, FacadeError> {
        let rows = self.query(projections, select.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Reads whole models selected by `select`.
    pub async fn find(&self, select: query::Select) -> Result<Vec<M>, FacadeError> {
        self.scoped(Commit::No, async |s| {
            Ok(repo::models_select::<M>(s, &select).await?)
        })
        .await
    }

    /// Reads the model whose primary key is `id`.
    pub async fn get(&self, id: impl Into<query::Value>) -> Result<M, FacadeError> {
        let id = id.into();
        let select = query::Select::new()
            .filter(M::column(M::PRIMARY_KEY).eq(id.clone()))
            .limit(1);

        self.find(select)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FacadeError::NotFound(format!("`{}` with key {}", M::TABLE, id)))
    }

    async fn aggregate(
        &self,
        func: query::AggFn,
        columns: &[query::Column],
        filter: query::Filter,
    ) -> Result<Vec<query::Value>, FacadeError> {
        self.scoped(Commit::No, async |s| {
            Ok(repo::records_aggregate(s, M::TABLE, func, columns, &filter).await?)
        })
        .await
    }

    async fn aggregate_one(
        &self,
        func: query::AggFn,
        column: query::Column,
        filter: query::Filter,
    ) -> Result<query::Value, FacadeError> {
        let values = self.aggregate(func, &[column], filter).await?;
        Ok(values
            .into_iter()
            .next()
            .unwrap_or(query::Value::Integer(0)))
    }

    pub async fn sum(
        &self,
        columns: &[query::Column],
        filter: impl Into<query::Filter>,
    ) -> Result<Vec<query::Value>, FacadeError> {
        self.aggregate(query::AggFn::Sum, columns, filter.into()).await
    }

    pub async fn max(
        &self,
        columns: &[query::Column],
        filter: impl Into<query::Filter>,
    ) -> Result<Vec<query::Value>, FacadeError> {
        self.aggregate(query::AggFn::Max, columns, filter.into()).await
    }

    pub async fn min(
        &self,
        columns: &[query::Column],
        filter: impl Into<query::Filter>,
    ) -> Result<Vec<query::Value>, FacadeError> {
        self.aggregate(query::AggFn::Min, columns, filter.into()).await
    }

    pub async fn avg(
        &self,
        columns: &[query::Column],
        filter: impl Into<query::Filter>,
    ) -> Result<Vec<query::Value>, FacadeError> {
        self.aggregate(query::AggFn::Avg, columns, filter.into()).await
    }

    /// Sum of a single column, `0` when no row matches.
    pub async fn sum_one(
        &self,
        column: impl Into<query::Column>,
        filter: impl Into<query::Filter>,
    ) -> Result<query::Value, FacadeError> {
        self.aggregate_one(query::AggFn::Sum, column.into(), filter.into())
            .await
    }

    pub async fn max_one(
        &self,
        column: impl Into<query::Column>,
        filter: impl Into<query::Filter>,
    ) -> Result<query::Value, FacadeError> {
        self.aggregate_one(query::AggFn::Max, column.into(), filter.into())
            .await
    }

    pub async fn min_one(
        &self,
        column: impl Into<query::Column>,
        filter: impl Into<query::Filter>,
    ) -> Result<query::Value, FacadeError> {
        self.aggregate_one(query::AggFn::Min, column.into(), filter.into())
            .await
    }

    pub async fn avg_one(
        &self,
        column: impl Into<query::Column>,
        filter: impl Into<query::Filter>,
    ) -> Result<query::Value, FacadeError> {
        self.aggregate_one(query::AggFn::Avg, column.into(), filter.into())
            .await
    }

    /// Counts the rows matching `filter`. With `distinct` set, counts the distinct
    /// tuples of `columns` instead.
    pub async fn count(
        &self,
        columns: &[query::Column],
        filter: impl Into<query::Filter>,
        distinct: bool,
    ) -> Result<i64, FacadeError> {
        let filter = filter.into();
        self.scoped(Commit::No, async |s| {
            Ok(repo::records_count(s, M::TABLE, columns, &filter, distinct).await?)
        })
        .await
    }

    /// Reads every row matching `filter`, `page_size` rows at a time.
    ///
    /// Rows are ordered by primary key and returned in page order. All pages are
    /// read within the same session.
    pub async fn simple_paging_query(
        &self,
        projections: &[query::Projection],
        filter: impl Into<query::Filter>,
        page_size: u64,
    ) -> Result<Vec<Record>, FacadeError> {
        let filter = filter.into();
        let pk = M::column(M::PRIMARY_KEY);

        self.scoped(Commit::No, async |s| {
            let total = repo::records_count(s, M::TABLE, &[pk.clone()], &filter, false).await?;
            let pages = query::page_windows(u64::try_from(total).unwrap_or_default(), page_size)?;
            debug!("paging {} rows of `{}` by {}", total, M::TABLE, page_size);

            let mut records = Vec::new();
            for page in pages {
                trace!("reading page at offset {}", page.offset);
                let select = query::Select::new()
                    .filter(filter.clone())
                    .order_by(pk.asc())
                    .limit(page.limit)
                    .offset(page.offset);
                records.extend(repo::records_select(s, M::TABLE, projections, &select).await?);
            }
            Ok(records)
        })
        .await
    }

    /// Runs a raw statement on the model's database and commits, returning the
    /// number of affected rows.
    pub async fn execute(&self, sql: &str) -> Result<u64, FacadeError> {
        self.scoped(Commit::Yes, async |s| Ok(repo::raw_execute(s, sql).await?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Assignments, Filter, JoinOn, Projection, Select, Value, col};
    use crate::repo::testing::{self, Order, OrderDetail};

    async fn setup() -> (FacadeModel<Order>, FacadeModel<OrderDetail>) {
        let engines = testing::memory_engines();
        let orders = FacadeModel::<Order>::new(engines.clone());
        repo::scoped(&engines, repo::DEFAULT_DATABASE, Commit::Yes, async |s| {
            testing::create_tables(s).await
        })
        .await
        .unwrap();
        (orders, FacadeModel::new(engines))
    }

    fn order_ids(records: &[Record]) -> Vec<i64> {
        records
            .iter()
            .map(|r| r.get("order_id").and_then(Value::as_i64).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn crud() {
        let (orders, _) = setup().await;

        orders.add(&Order::new(1, "will", 1)).await.unwrap();
        let n = orders
            .batch_add(&[Order::new(2, "jack", 2), Order::new(3, "ann", 2)])
            .await
            .unwrap();
        assert_eq!(n, 2);

        let changed = orders
            .update(
                Assignments::new().set("contact_person", "jill"),
                col("order_id").eq(2),
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(orders.get(2).await.unwrap().contact_person, "jill");

        let first = orders
            .first(
                &[Projection::from("order_id")],
                Select::new().order_by(col("order_id").desc()),
            )
            .await
            .unwrap();
        assert_eq!(first.unwrap().get("order_id"), Some(&Value::Integer(3)));

        let found = orders
            .find(Select::new().filter(col("member_id").eq(2)))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        assert_eq!(orders.delete(col("member_id").eq(2)).await.unwrap(), 2);
        assert!(matches!(
            orders.get(2).await,
            Err(FacadeError::NotFound(_))
        ));
        assert_eq!(orders.delete(Filter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_rows() {
        let (orders, _) = setup().await;

        // the duplicated key fails the last insert
        let res = orders
            .batch_add(&[
                Order::new(1, "will", 1),
                Order::new(2, "jack", 1),
                Order::new(1, "ann", 1),
            ])
            .await;
        assert!(matches!(res, Err(FacadeError::RepositoryError(_))));

        let count = orders
            .count(&[col("order_id")], Filter::all(), false)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // the session was released, the next unit of work runs normally
        orders.add(&Order::new(1, "will", 1)).await.unwrap();
        assert_eq!(
            orders.count(&[col("order_id")], Filter::all(), false).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let (orders, _) = setup().await;
        let res = orders.update(Assignments::new(), Filter::all()).await;
        assert!(matches!(
            res,
            Err(FacadeError::RepositoryError(repo::Error::QueryError(_)))
        ));
    }

    #[tokio::test]
    async fn aggregates() {
        let (orders, _) = setup().await;

        assert_eq!(
            orders.sum_one("total", Filter::all()).await.unwrap(),
            Value::Integer(0)
        );
        assert_eq!(
            orders.avg_one("total", Filter::all()).await.unwrap(),
            Value::Integer(0)
        );

        orders
            .batch_add(&[
                Order::new(1, "will", 1).with_total(4.0),
                Order::new(2, "jack", 1).with_total(8.0),
                Order::new(3, "ann", 2).with_total(1.5),
            ])
            .await
            .unwrap();

        assert_eq!(
            orders.sum_one("total", col("member_id").eq(1)).await.unwrap(),
            Value::Float(12.0)
        );
        assert_eq!(
            orders.avg_one("total", col("member_id").eq(1)).await.unwrap(),
            Value::Float(6.0)
        );
        assert_eq!(
            orders.max(&[col("total"), col("order_id")], Filter::all()).await.unwrap(),
            vec![Value::Float(8.0), Value::Integer(3)]
        );
        assert_eq!(
            orders.min(&[col("total")], Filter::all()).await.unwrap(),
            vec![Value::Float(1.5)]
        );
        assert_eq!(
            orders.sum(&[col("member_id")], Filter::all()).await.unwrap(),
            vec![Value::Integer(4)]
        );
        assert_eq!(
            orders.min_one("order_id", Filter::all()).await.unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            orders.max_one("order_id", col("member_id").eq(1)).await.unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            orders.count(&[col("member_id")], Filter::all(), true).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn join_materializes_rows() {
        let (orders, details) = setup().await;

        orders.add(&Order::new(1, "will", 1)).await.unwrap();
        details
            .batch_add(&[
                OrderDetail::new(10, 1, "apple", 3),
                OrderDetail::new(11, 1, "pear", 1),
            ])
            .await
            .unwrap();

        let rows = orders
            .join::<OrderDetail>(
                &[JoinOn::new(
                    Order::column("order_id"),
                    OrderDetail::column("orderid"),
                )],
                &[Projection::from(OrderDetail::column("goods_name"))],
                OrderDetail::column("amount").geq(3),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("goods_name"), Some(&Value::from("apple")));
    }

    #[tokio::test]
    async fn paging_returns_rows_in_key_order() {
        let (orders, _) = setup().await;

        // inserted out of key order
        let ids = [7, 3, 1, 6, 2, 5, 4];
        let models: Vec<Order> = ids.iter().map(|&id| Order::new(id, "will", id % 2)).collect();
        orders.batch_add(&models).await.unwrap();

        let projection = [Projection::from("order_id")];

        let all = orders
            .simple_paging_query(&projection, Filter::all(), 3)
            .await
            .unwrap();
        assert_eq!(order_ids(&all), vec![1, 2, 3, 4, 5, 6, 7]);

        let odd = orders
            .simple_paging_query(&projection, col("member_id").eq(1), 2)
            .await
            .unwrap();
        assert_eq!(order_ids(&odd), vec![1, 3, 5, 7]);

        let none = orders
            .simple_paging_query(&projection, col("order_id").gt(100), 2)
            .await
            .unwrap();
        assert!(none.is_empty());

        let res = orders.simple_paging_query(&projection, Filter::all(), 0).await;
        assert!(matches!(res, Err(FacadeError::RepositoryError(_))));
    }

    #[tokio::test]
    async fn execute_commits_raw_statements() {
        let (orders, _) = setup().await;
        orders.add(&Order::new(1, "will", 1)).await.unwrap();

        let affected = orders
            .execute("UPDATE orders SET status = 1")
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert!(orders.get(1).await.unwrap().status);
    }

    #[tokio::test]
    async fn undeclared_database() {
        let orders = FacadeModel::<Order>::new(repo::Engines::new());
        let res = orders.count(&[col("order_id")], Filter::all(), false).await;
        assert!(matches!(
            res,
            Err(FacadeError::RepositoryError(repo::Error::UnknownDatabase(_)))
        ));
    }

    /// Inserts 100 orders with one detail each, every `add` committing on its own.
    /// At row 50 the engines are torn down: with `crash` set nothing else is
    /// written, otherwise new engines are built on the same file and the load
    /// resumes.
    async fn load(dir: &std::path::Path, crash: bool) {
        let mut engines = testing::file_engines(dir);
        repo::scoped(&engines, repo::DEFAULT_DATABASE, Commit::Yes, async |s| {
            testing::create_tables(s).await
        })
        .await
        .unwrap();

        for id in 1..=100 {
            let orders = FacadeModel::<Order>::new(engines.clone());
            orders.add(&Order::new(id, "will", id % 7)).await.unwrap();

            if id == 50 {
                engines.close().await;
                if crash {
                    return;
                }
                engines = testing::file_engines(dir);
            }

            let details = FacadeModel::<OrderDetail>::new(engines.clone());
            details
                .add(&OrderDetail::new(1000 + id, id, "apple", 1))
                .await
                .unwrap();
        }

        engines.close().await;
    }

    #[tokio::test]
    async fn restarted_engines_see_committed_rows() {
        let dir = tempfile::tempdir().unwrap();
        load(dir.path(), false).await;

        let engines = testing::file_engines(dir.path());
        let orders = FacadeModel::<Order>::new(engines.clone());
        let details = FacadeModel::<OrderDetail>::new(engines.clone());

        let n_orders = orders.count(&[col("order_id")], Filter::all(), false).await.unwrap();
        let n_details = details.count(&[col("detail_id")], Filter::all(), false).await.unwrap();
        assert_eq!(n_orders + n_details, 200);

        engines.close().await;
    }

    #[tokio::test]
    async fn crash_keeps_only_committed_rows() {
        let dir = tempfile::tempdir().unwrap();
        load(dir.path(), true).await;

        let engines = testing::file_engines(dir.path());
        let orders = FacadeModel::<Order>::new(engines.clone());
        let details = FacadeModel::<OrderDetail>::new(engines.clone());

        assert_eq!(
            orders.count(&[col("order_id")], Filter::all(), false).await.unwrap(),
            50
        );
        assert_eq!(
            details.count(&[col("detail_id")], Filter::all(), false).await.unwrap(),
            49
        );

        engines.close().await;
    }
}
