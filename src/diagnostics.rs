use crate::error::DriverError;
use crate::handle::{self, Connection, Environment, Statement};
use crate::types::*;
use parking_lot::Mutex;
use std::ptr;

/// Diagnostic record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagRecord {
    pub state: String, // 5-char SQLSTATE e.g. "HY000"
    pub native_error: i32,
    pub message: String,
}

impl From<&DriverError> for DiagRecord {
    fn from(err: &DriverError) -> Self {
        Self {
            state: err.sqlstate().to_string(),
            native_error: err.native_code(),
            message: err.to_string(),
        }
    }
}

/// Most recent error of one handle. Cleared at the start of every call on
/// that handle, overwritten by the next failure.
#[derive(Debug, Default)]
pub struct ErrorContext {
    record: Mutex<Option<DiagRecord>>,
}

impl ErrorContext {
    pub fn clear(&self) {
        *self.record.lock() = None;
    }

    pub fn set(&self, err: &DriverError) {
        *self.record.lock() = Some(DiagRecord::from(err));
    }

    pub fn record(&self) -> Option<DiagRecord> {
        self.record.lock().clone()
    }

    /// Records a failure and turns the outcome into a return code.
    pub fn report(&self, result: Result<SQLRETURN, DriverError>) -> SQLRETURN {
        match result {
            Ok(rc) => rc,
            Err(err) => {
                match err.severity() {
                    crate::error::Severity::Info => tracing::debug!(state = err.sqlstate(), "{err}"),
                    crate::error::Severity::Error => tracing::warn!(state = err.sqlstate(), "{err}"),
                }
                self.set(&err);
                err.return_code()
            }
        }
    }
}

fn context_of<'a>(handle_type: SQLSMALLINT, handle: SQLHANDLE) -> Option<&'a ErrorContext> {
    let errors = match handle_type {
        SQL_HANDLE_ENV => &unsafe { handle::borrow::<Environment>(handle) }.errors,
        SQL_HANDLE_DBC => &unsafe { handle::borrow::<Connection>(handle) }.errors,
        SQL_HANDLE_STMT => &unsafe { handle::borrow::<Statement>(handle) }.errors,
        _ => return None,
    };
    Some(errors)
}

pub fn get_diag_rec(
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    rec_number: SQLSMALLINT,
    sql_state: *mut SQLCHAR,
    native_error: *mut SQLINTEGER,
    message_text: *mut SQLCHAR,
    buffer_length: SQLSMALLINT,
    text_length: *mut SQLSMALLINT,
) -> SQLRETURN {
    if handle.is_null() {
        return SQL_INVALID_HANDLE;
    }
    if rec_number < 1 {
        return SQL_ERROR;
    }
    // single-record model
    if rec_number > 1 {
        return SQL_NO_DATA;
    }
    let Some(errors) = context_of(handle_type, handle) else {
        return SQL_ERROR;
    };
    let Some(rec) = errors.record() else {
        return SQL_NO_DATA;
    };

    // Copy SQLSTATE (5 chars + null)
    if !sql_state.is_null() {
        let state_bytes = rec.state.as_bytes();
        let copy_len = std::cmp::min(state_bytes.len(), 5);
        unsafe {
            ptr::copy_nonoverlapping(state_bytes.as_ptr(), sql_state, copy_len);
            for i in copy_len..6 {
                *sql_state.add(i) = 0;
            }
        }
    }

    if !native_error.is_null() {
        unsafe {
            *native_error = rec.native_error;
        }
    }

    unsafe {
        crate::write_c_str(&rec.message, message_text, buffer_length as SQLLEN, text_length);
    }

    SQL_SUCCESS
}

/// ODBC 2 entry: reports the most specific handle that was passed.
pub fn error(
    env: SQLHENV,
    conn: SQLHDBC,
    stmt: SQLHSTMT,
    sql_state: *mut SQLCHAR,
    native_error: *mut SQLINTEGER,
    message_text: *mut SQLCHAR,
    buffer_length: SQLSMALLINT,
    text_length: *mut SQLSMALLINT,
) -> SQLRETURN {
    let (handle_type, handle) = if !stmt.is_null() {
        (SQL_HANDLE_STMT, stmt)
    } else if !conn.is_null() {
        (SQL_HANDLE_DBC, conn)
    } else {
        (SQL_HANDLE_ENV, env)
    };
    get_diag_rec(
        handle_type,
        handle,
        1,
        sql_state,
        native_error,
        message_text,
        buffer_length,
        text_length,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_records_and_maps_severity() {
        let ctx = ErrorContext::default();
        assert_eq!(ctx.report(Ok(SQL_SUCCESS)), SQL_SUCCESS);
        assert!(ctx.record().is_none());

        assert_eq!(ctx.report(Err(DriverError::StringTruncated)), SQL_SUCCESS_WITH_INFO);
        assert_eq!(ctx.record().unwrap().state, "01004");

        assert_eq!(ctx.report(Err(DriverError::NoResultSet)), SQL_ERROR);
        let rec = ctx.record().unwrap();
        assert_eq!(rec.message, "no result set cached or not ready");
        assert_eq!(rec.native_error, crate::error::code::TSC_QUERY_CACHE_ERASED);

        ctx.clear();
        assert!(ctx.record().is_none());
    }
}
