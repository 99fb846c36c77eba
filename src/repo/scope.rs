//! Transactional scoping of a unit of work.
//!
//! [`scoped`] acquires a session, runs the operation against it and finalizes the
//! session according to the outcome:
//!
//! | outcome                 | finalization                |
//! |-------------------------|-----------------------------|
//! | `Ok`, [`Commit::Yes`]   | commit, close               |
//! | `Ok`, [`Commit::No`]    | close                       |
//! | `Err` from operation    | rollback, close             |
//! | `Err` from commit       | rollback, close             |
//!
//! The error returned to the caller is always the original one.

use log::warn;

use super::{Error, SessionProvider, Transactional};

/// Whether a successful unit of work is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Yes,
    No,
}

/// Runs `op` inside a session of `database`.
///
/// ```no_run
/// # async fn demo(engines: modelkit::repo::Engines) -> Result<(), modelkit::repo::Error> {
/// use modelkit::repo::{self, Commit};
///
/// let affected = repo::scoped(&engines, "default", Commit::Yes, async |session| {
///     repo::raw_execute(session, "DELETE FROM orders").await
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn scoped<P, F, T, E>(provider: &P, database: &str, commit: Commit, op: F) -> Result<T, E>
where
    P: SessionProvider,
    F: AsyncFnOnce(&mut P::Session) -> Result<T, E>,
    E: From<Error>,
{
    let mut session = provider.session(database).await?;

    let outcome = match op(&mut session).await {
        Ok(value) if commit == Commit::Yes => match session.commit().await {
            Ok(()) => Ok(value),
            Err(err) => Err(E::from(err)),
        },
        other => other,
    };

    if outcome.is_err() {
        if let Err(err) = session.rollback().await {
            warn!("rollback failed on `{}` :: {}", database, err);
        }
    }

    session.close().await;

    outcome
}
