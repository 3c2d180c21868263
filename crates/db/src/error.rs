//! Translation of database errors into register errors.

use custodia_core::register::RegisterError;
use sea_orm::{DbErr, RuntimeErr};

/// `lock_not_available`, raised when `lock_timeout` expires.
pub const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `serialization_failure`.
pub const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`.
pub const DEADLOCK_DETECTED: &str = "40P01";
/// `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Returns the SQLSTATE carried by a database error, if any.
#[must_use]
pub fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => {
            e.code().map(|code| code.into_owned())
        }
        _ => None,
    }
}

/// Returns true if the error means the operation lost a lock race and may be
/// retried.
#[must_use]
pub fn is_contention(err: &DbErr) -> bool {
    matches!(
        sqlstate(err).as_deref(),
        Some(LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
    )
}

/// Returns true if the error is a unique constraint violation.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    sqlstate(err).as_deref() == Some(UNIQUE_VIOLATION)
}

/// Maps a database error to a register error.
///
/// Lock timeouts, serialization failures and deadlocks become a retryable
/// `Conflict`; everything else is a `Storage` error.
#[must_use]
pub fn map_db_error(err: DbErr) -> RegisterError {
    if is_contention(&err) {
        tracing::warn!(error = %err, "Register write lost a lock race");
        return RegisterError::Conflict(format!("concurrent register update: {err}"));
    }
    tracing::error!(error = %err, "Database error");
    RegisterError::Storage(err.to_string())
}
