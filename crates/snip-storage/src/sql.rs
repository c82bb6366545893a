//! Helpers shared by the `sqlx`-backed stores.

use jiff::Timestamp;
use snip_core::error::Result;
use snip_core::StoreError;

pub(crate) fn now_unix_millis() -> i64 {
    Timestamp::now().as_millisecond()
}

pub(crate) fn parse_created_at(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StoreError::InvalidData(format!("invalid created_at timestamp '{}': {e}", millis))
    })
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed => StoreError::Closed,
        sqlx::Error::WorkerCrashed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(message)
        }
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}
