//! [`Database`]-related implementations.

#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Transaction commit rejected because of a concurrent conflicting
    /// transaction.
    #[display("transaction conflicted with a concurrent one")]
    Conflict,

    /// [`Postgres`] error.
    #[cfg(feature = "postgres")]
    #[from]
    Postgres(postgres::Error),
}

impl Error {
    /// Indicates whether retrying the whole transaction may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Conflict => true,
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_serialization_failure(),
        }
    }
}
