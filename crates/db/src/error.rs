//! Errors raised by profile persistence.

use biodata_core::error::CoreError;

/// Failure of a profile write.
///
/// `Core` covers problems found before any statement ran (bad input, missing
/// record). `Storage` means PostgreSQL rejected the statement; `fields` lists
/// the columns the statement touched so operators can find the culprit in
/// logs without the statement text reaching clients.
#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage rejected write to [{fields}]: {source}")]
    Storage {
        fields: String,
        #[source]
        source: sqlx::Error,
    },
}

impl ProfileStoreError {
    pub(crate) fn storage(fields: &[&str], source: sqlx::Error) -> Self {
        ProfileStoreError::Storage {
            fields: fields.join(", "),
            source,
        }
    }
}

impl From<sqlx::Error> for ProfileStoreError {
    fn from(source: sqlx::Error) -> Self {
        ProfileStoreError::Storage {
            fields: String::new(),
            source,
        }
    }
}
