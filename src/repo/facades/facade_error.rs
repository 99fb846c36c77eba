use crate::repo;

#[derive(thiserror::Error, Debug)]
pub enum FacadeError {
    #[error("unable to find data: {0}")]
    NotFound(String),
    #[error("unable to join `{left}` with `{right}`: tables live in different databases")]
    CrossDatabaseJoin { left: String, right: String },
    #[error("repository error :: {0}")]
    RepositoryError(#[from] repo::Error),
}

impl From<crate::query::Error> for FacadeError {
    fn from(value: crate::query::Error) -> Self {
        Self::RepositoryError(repo::Error::from(value))
    }
}
