#![allow(non_snake_case)]
#![allow(clippy::not_unsafe_ptr_arg_deref, clippy::too_many_arguments)]

mod attr;
mod bind;
pub mod connect;
mod convert;
mod diagnostics;
pub mod engine;
pub mod error;
mod execute;
mod fetch;
pub mod handle;
pub mod runtime;
mod timestamp;
pub mod types;

use attr::ColumnAttribute;
use error::DriverError;
use handle::{Connection, Environment, Statement};
use std::ffi::CStr;
use std::ptr;
use types::*;

// ── Helpers: C strings in and out ───────────────────────────────────

/// Reads `len` bytes, or up to the first NUL when `len` is `SQL_NTS` or negative.
unsafe fn read_c_str(ptr: *const SQLCHAR, len: SQLLEN) -> String {
    if ptr.is_null() {
        return String::new();
    }
    if len == SQL_NTS || len < 0 {
        CStr::from_ptr(ptr as *const std::ffi::c_char)
            .to_string_lossy()
            .into_owned()
    } else {
        let slice = std::slice::from_raw_parts(ptr, len as usize);
        String::from_utf8_lossy(slice).into_owned()
    }
}

/// Copies at most `buf_len - 1` bytes plus a NUL and reports the full
/// length. Returns whether the copy was truncated.
pub(crate) unsafe fn write_c_str(
    s: &str,
    buf: *mut SQLCHAR,
    buf_len: SQLLEN,
    out_len: *mut SQLSMALLINT,
) -> bool {
    let bytes = s.as_bytes();
    if !out_len.is_null() {
        *out_len = bytes.len().min(SQLSMALLINT::MAX as usize) as SQLSMALLINT;
    }
    if buf.is_null() || buf_len <= 0 {
        return !bytes.is_empty();
    }
    let copy_len = bytes.len().min(buf_len as usize - 1);
    ptr::copy_nonoverlapping(bytes.as_ptr(), buf, copy_len);
    *buf.add(copy_len) = 0;
    copy_len < bytes.len()
}

unsafe fn write_out<T>(ptr: *mut T, value: T) {
    if !ptr.is_null() {
        *ptr = value;
    }
}

fn with_conn(
    hdbc: SQLHDBC,
    f: impl FnOnce(&Connection) -> Result<SQLRETURN, DriverError>,
) -> SQLRETURN {
    if hdbc.is_null() {
        return SQL_INVALID_HANDLE;
    }
    let conn = unsafe { handle::borrow::<Connection>(hdbc) };
    conn.errors.clear();
    conn.errors.report(f(conn))
}

fn with_stmt(
    hstmt: SQLHSTMT,
    f: impl FnOnce(&Statement) -> Result<SQLRETURN, DriverError>,
) -> SQLRETURN {
    if hstmt.is_null() {
        return SQL_INVALID_HANDLE;
    }
    let stmt = unsafe { handle::borrow::<Statement>(hstmt) };
    stmt.errors.clear();
    stmt.errors.report(f(stmt))
}

// ── Handle Management ───────────────────────────────────────────────

fn alloc_handle_impl(
    handle_type: SQLSMALLINT,
    input_handle: SQLHANDLE,
    output_handle: *mut SQLHANDLE,
) -> SQLRETURN {
    if output_handle.is_null() {
        return SQL_ERROR;
    }

    let raw = match handle_type {
        SQL_HANDLE_ENV => handle::into_raw(handle::alloc_environment()),
        SQL_HANDLE_DBC => {
            if input_handle.is_null() {
                return SQL_INVALID_HANDLE;
            }
            let env = unsafe { handle::share::<Environment>(input_handle) };
            env.errors.clear();
            handle::into_raw(handle::alloc_connection(&env))
        }
        SQL_HANDLE_STMT => {
            if input_handle.is_null() {
                return SQL_INVALID_HANDLE;
            }
            let conn = unsafe { handle::share::<Connection>(input_handle) };
            conn.errors.clear();
            handle::into_raw(handle::alloc_statement(&conn))
        }
        other => {
            tracing::warn!(handle_type = other, "unsupported handle type");
            return SQL_ERROR;
        }
    };
    unsafe {
        *output_handle = raw;
    }
    SQL_SUCCESS
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLAllocHandle(
    handle_type: SQLSMALLINT,
    input_handle: SQLHANDLE,
    output_handle: *mut SQLHANDLE,
) -> SQLRETURN {
    alloc_handle_impl(handle_type, input_handle, output_handle)
}

fn free_handle_impl(handle_type: SQLSMALLINT, handle: SQLHANDLE) -> SQLRETURN {
    if handle.is_null() {
        return SQL_INVALID_HANDLE;
    }

    match handle_type {
        SQL_HANDLE_ENV => handle::free_environment(unsafe { handle::take(handle) }),
        SQL_HANDLE_DBC => handle::free_connection(unsafe { handle::take(handle) }),
        SQL_HANDLE_STMT => handle::free_statement(unsafe { handle::take(handle) }),
        _ => return SQL_ERROR,
    }
    SQL_SUCCESS
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLFreeHandle(handle_type: SQLSMALLINT, handle: SQLHANDLE) -> SQLRETURN {
    free_handle_impl(handle_type, handle)
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLFreeStmt(hstmt: SQLHSTMT, option: SQLUSMALLINT) -> SQLRETURN {
    if option == SQL_DROP {
        return free_handle_impl(SQL_HANDLE_STMT, hstmt);
    }
    with_stmt(hstmt, |_| match option {
        SQL_CLOSE => Ok(SQL_SUCCESS),
        other => Err(DriverError::not_supported(format!(
            "free statement with Option[{other:x}] not supported yet"
        ))),
    })
}

// ODBC 2.x allocation entry points

#[unsafe(no_mangle)]
pub extern "C" fn SQLAllocEnv(phenv: *mut SQLHENV) -> SQLRETURN {
    alloc_handle_impl(SQL_HANDLE_ENV, ptr::null_mut(), phenv)
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLAllocConnect(henv: SQLHENV, phdbc: *mut SQLHDBC) -> SQLRETURN {
    alloc_handle_impl(SQL_HANDLE_DBC, henv, phdbc)
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLAllocStmt(hdbc: SQLHDBC, phstmt: *mut SQLHSTMT) -> SQLRETURN {
    alloc_handle_impl(SQL_HANDLE_STMT, hdbc, phstmt)
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLFreeConnect(hdbc: SQLHDBC) -> SQLRETURN {
    free_handle_impl(SQL_HANDLE_DBC, hdbc)
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLFreeEnv(henv: SQLHENV) -> SQLRETURN {
    free_handle_impl(SQL_HANDLE_ENV, henv)
}

// ── Connection ──────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn SQLConnect(
    hdbc: SQLHDBC,
    dsn: *const SQLCHAR,
    dsn_len: SQLSMALLINT,
    uid: *const SQLCHAR,
    uid_len: SQLSMALLINT,
    pwd: *const SQLCHAR,
    pwd_len: SQLSMALLINT,
) -> SQLRETURN {
    with_conn(hdbc, |conn| {
        let (dsn, uid, pwd) = unsafe {
            (
                read_c_str(dsn, dsn_len as SQLLEN),
                read_c_str(uid, uid_len as SQLLEN),
                read_c_str(pwd, pwd_len as SQLLEN),
            )
        };
        let params = connect::target_params(&dsn, &uid, &pwd, &connect::odbc_ini_paths());
        connect::connect(conn, params)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLDriverConnect(
    hdbc: SQLHDBC,
    _hwnd: SQLHWND,
    conn_str_in: *const SQLCHAR,
    conn_str_in_len: SQLSMALLINT,
    conn_str_out: *mut SQLCHAR,
    conn_str_out_max: SQLSMALLINT,
    conn_str_out_len: *mut SQLSMALLINT,
    driver_completion: SQLUSMALLINT,
) -> SQLRETURN {
    with_conn(hdbc, |conn| {
        let conn_str = unsafe { read_c_str(conn_str_in, conn_str_in_len as SQLLEN) };
        connect::driver_connect(
            conn,
            &conn_str,
            driver_completion,
            &connect::odbc_ini_paths(),
        )?;

        // Write back the connection string
        let truncated = unsafe {
            write_c_str(
                &conn_str,
                conn_str_out,
                conn_str_out_max as SQLLEN,
                conn_str_out_len,
            )
        };
        if truncated && !conn_str_out.is_null() {
            return Err(DriverError::StringTruncated);
        }
        Ok(SQL_SUCCESS)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLDisconnect(hdbc: SQLHDBC) -> SQLRETURN {
    with_conn(hdbc, |conn| Ok(connect::disconnect(conn)))
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLSetConnectAttr(
    hdbc: SQLHDBC,
    attribute: SQLINTEGER,
    value: SQLPOINTER,
    _string_length: SQLINTEGER,
) -> SQLRETURN {
    with_conn(hdbc, |conn| attr::set_connect_attr(conn, attribute, value))
}

// ── Execution ───────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn SQLExecDirect(
    hstmt: SQLHSTMT,
    sql: *const SQLCHAR,
    sql_len: SQLINTEGER,
) -> SQLRETURN {
    with_stmt(hstmt, |stmt| {
        let sql = unsafe { read_c_str(sql, sql_len as SQLLEN) };
        execute::exec_direct(stmt, &sql)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLPrepare(
    hstmt: SQLHSTMT,
    sql: *const SQLCHAR,
    sql_len: SQLINTEGER,
) -> SQLRETURN {
    with_stmt(hstmt, |stmt| {
        let sql = unsafe { read_c_str(sql, sql_len as SQLLEN) };
        execute::prepare(stmt, &sql)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLBindParameter(
    hstmt: SQLHSTMT,
    parameter_number: SQLUSMALLINT,
    input_output_type: SQLSMALLINT,
    value_type: SQLSMALLINT,
    parameter_type: SQLSMALLINT,
    column_size: SQLULEN,
    decimal_digits: SQLSMALLINT,
    parameter_value: SQLPOINTER,
    buffer_length: SQLLEN,
    str_len_or_ind: *mut SQLLEN,
) -> SQLRETURN {
    with_stmt(hstmt, |stmt| {
        execute::bind_parameter(
            stmt,
            parameter_number,
            input_output_type,
            value_type,
            parameter_type,
            column_size,
            decimal_digits,
            parameter_value,
            buffer_length,
            str_len_or_ind,
        )
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLExecute(hstmt: SQLHSTMT) -> SQLRETURN {
    with_stmt(hstmt, |stmt| unsafe { execute::execute(stmt) })
}

// ── Results ─────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn SQLNumResultCols(hstmt: SQLHSTMT, column_count: *mut SQLSMALLINT) -> SQLRETURN {
    with_stmt(hstmt, |stmt| {
        let n = fetch::num_result_cols(stmt)?;
        unsafe { write_out(column_count, n as SQLSMALLINT) };
        Ok(SQL_SUCCESS)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLRowCount(hstmt: SQLHSTMT, row_count: *mut SQLLEN) -> SQLRETURN {
    with_stmt(hstmt, |stmt| {
        let n = fetch::row_count(stmt)?;
        unsafe { write_out(row_count, n as SQLLEN) };
        Ok(SQL_SUCCESS)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLDescribeCol(
    hstmt: SQLHSTMT,
    column_number: SQLUSMALLINT,
    column_name: *mut SQLCHAR,
    buffer_length: SQLSMALLINT,
    name_length: *mut SQLSMALLINT,
    data_type: *mut SQLSMALLINT,
    column_size: *mut SQLULEN,
    decimal_digits: *mut SQLSMALLINT,
    nullable: *mut SQLSMALLINT,
) -> SQLRETURN {
    with_stmt(hstmt, |stmt| {
        let desc = fetch::describe_col(stmt, column_number)?;
        unsafe {
            write_c_str(&desc.name, column_name, buffer_length as SQLLEN, name_length);
            write_out(data_type, desc.data_type);
            write_out(column_size, desc.column_size);
            write_out(decimal_digits, desc.decimal_digits);
            write_out(nullable, desc.nullable);
        }
        Ok(SQL_SUCCESS)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLColAttribute(
    hstmt: SQLHSTMT,
    column_number: SQLUSMALLINT,
    field_identifier: SQLUSMALLINT,
    character_attribute: SQLPOINTER,
    buffer_length: SQLSMALLINT,
    string_length: *mut SQLSMALLINT,
    numeric_attribute: *mut SQLLEN,
) -> SQLRETURN {
    with_stmt(hstmt, |stmt| {
        match attr::column_attribute(stmt, column_number, field_identifier)? {
            ColumnAttribute::Numeric(n) => unsafe { write_out(numeric_attribute, n) },
            ColumnAttribute::Text(s) => unsafe {
                write_c_str(
                    &s,
                    character_attribute as *mut SQLCHAR,
                    buffer_length as SQLLEN,
                    string_length,
                );
            },
        }
        Ok(SQL_SUCCESS)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLFetch(hstmt: SQLHSTMT) -> SQLRETURN {
    with_stmt(hstmt, fetch::fetch)
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLGetData(
    hstmt: SQLHSTMT,
    column_number: SQLUSMALLINT,
    target_type: SQLSMALLINT,
    target_value: SQLPOINTER,
    buffer_length: SQLLEN,
    str_len_or_ind: *mut SQLLEN,
) -> SQLRETURN {
    with_stmt(hstmt, |stmt| unsafe {
        fetch::get_data(
            stmt,
            column_number,
            target_type,
            target_value,
            buffer_length,
            str_len_or_ind,
        )
    })
}

// ── Diagnostics ─────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn SQLGetDiagRec(
    handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    rec_number: SQLSMALLINT,
    sql_state: *mut SQLCHAR,
    native_error: *mut SQLINTEGER,
    message_text: *mut SQLCHAR,
    buffer_length: SQLSMALLINT,
    text_length: *mut SQLSMALLINT,
) -> SQLRETURN {
    diagnostics::get_diag_rec(
        handle_type,
        handle,
        rec_number,
        sql_state,
        native_error,
        message_text,
        buffer_length,
        text_length,
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLGetDiagField(
    _handle_type: SQLSMALLINT,
    handle: SQLHANDLE,
    _rec_number: SQLSMALLINT,
    _diag_identifier: SQLSMALLINT,
    _diag_info: SQLPOINTER,
    _buffer_length: SQLSMALLINT,
    _string_length: *mut SQLSMALLINT,
) -> SQLRETURN {
    if handle.is_null() {
        return SQL_INVALID_HANDLE;
    }
    SQL_ERROR
}

#[unsafe(no_mangle)]
pub extern "C" fn SQLError(
    henv: SQLHENV,
    hdbc: SQLHDBC,
    hstmt: SQLHSTMT,
    sql_state: *mut SQLCHAR,
    native_error: *mut SQLINTEGER,
    message_text: *mut SQLCHAR,
    buffer_length: SQLSMALLINT,
    text_length: *mut SQLSMALLINT,
) -> SQLRETURN {
    diagnostics::error(
        henv,
        hdbc,
        hstmt,
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
    fn read_c_str_measures_nts() {
        let s = b"hello\0world";
        unsafe {
            assert_eq!(read_c_str(s.as_ptr(), SQL_NTS), "hello");
            assert_eq!(read_c_str(s.as_ptr(), -1), "hello");
            assert_eq!(read_c_str(s.as_ptr(), 3), "hel");
            assert_eq!(read_c_str(ptr::null(), SQL_NTS), "");
        }
    }

    #[test]
    fn write_c_str_truncates_and_terminates() {
        let mut buf = [0xffu8; 4];
        let mut len: SQLSMALLINT = 0;
        unsafe {
            assert!(write_c_str("abcdef", buf.as_mut_ptr(), 4, &mut len));
            assert_eq!(&buf, b"abc\0");
            assert_eq!(len, 6);

            assert!(!write_c_str("ab", buf.as_mut_ptr(), 4, &mut len));
            assert_eq!(&buf[..3], b"ab\0");
            assert_eq!(len, 2);

            assert!(write_c_str("ab", ptr::null_mut(), 0, &mut len));
            assert_eq!(len, 2);
        }
    }

    #[test]
    fn null_handles_are_invalid() {
        assert_eq!(SQLFetch(ptr::null_mut()), SQL_INVALID_HANDLE);
        assert_eq!(SQLDisconnect(ptr::null_mut()), SQL_INVALID_HANDLE);
        assert_eq!(SQLFreeHandle(SQL_HANDLE_STMT, ptr::null_mut()), SQL_INVALID_HANDLE);
        assert_eq!(
            SQLGetDiagField(SQL_HANDLE_ENV, ptr::null_mut(), 1, 0, ptr::null_mut(), 0, ptr::null_mut()),
            SQL_INVALID_HANDLE
        );
    }
}
