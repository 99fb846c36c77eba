/// Errors that can occur while building a query from its intermediate representation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("operation error :: field `{field}` has {err}")]
    OpError { field: String, err: super::OpError },

    #[error("bad field `{field}`")]
    BadField { field: String },

    /// The combination of parameters received cannot be turned into a statement.
    #[error("input error :: {0}")]
    InputError(String),
}

impl Error {
    pub fn unsupported_op(field_name: String) -> Self {
        Self::OpError {
            field: field_name,
            err: super::OpError::UnsupportedOperation,
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputError(msg.into())
    }
}
