use crate::contract::ContractStatus;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Contract id must not be empty")]
    EmptyId,
    #[error("Renter name must not be empty")]
    MissingRenter,
    #[error("Game reference must not be empty")]
    MissingGame,
    #[error("{0} is not set")]
    MissingDate(&'static str),
    #[error("Start Date <= Due Date failed")]
    InvalidDates,
    #[error("{0} is outside the storable range")]
    UnrepresentableDate(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to decode contract: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("failed to encode contract: {0}")]
    Encode(String),
    #[error("contract {0} already exists")]
    Conflict(String),
    #[error("contract {0} does not exist")]
    Missing(String),
    #[error("contract {id} is {found}, expected {expected}")]
    StatusChanged {
        id: String,
        expected: ContractStatus,
        found: ContractStatus,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("malformed filter '{0}'")]
    MalformedFilter(String),
    #[error("operator '{op}' is not supported for {field}")]
    UnsupportedOperator { field: &'static str, op: String },
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Caller-facing classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StoreFailure,
    InvalidInput,
    Unexpected,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Store(StoreError::Conflict(_)) => ErrorKind::InvalidInput,
            ServiceError::Store(_) => ErrorKind::StoreFailure,
            ServiceError::Validation(_) => ErrorKind::InvalidInput,
            ServiceError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }
}
