//! ODBC scalar aliases, return codes and the constant subset this driver speaks.

use std::ffi::c_void;

pub type SQLCHAR = u8;
pub type SQLSCHAR = i8;
pub type SQLSMALLINT = i16;
pub type SQLUSMALLINT = u16;
pub type SQLINTEGER = i32;
pub type SQLUINTEGER = u32;
pub type SQLLEN = isize;
pub type SQLULEN = usize;
pub type SQLRETURN = SQLSMALLINT;
pub type SQLPOINTER = *mut c_void;
pub type SQLHANDLE = *mut c_void;
pub type SQLHENV = SQLHANDLE;
pub type SQLHDBC = SQLHANDLE;
pub type SQLHSTMT = SQLHANDLE;
pub type SQLHWND = *mut c_void;

// Return codes
pub const SQL_SUCCESS: SQLRETURN = 0;
pub const SQL_SUCCESS_WITH_INFO: SQLRETURN = 1;
pub const SQL_NO_DATA: SQLRETURN = 100;
pub const SQL_ERROR: SQLRETURN = -1;
pub const SQL_INVALID_HANDLE: SQLRETURN = -2;

// Handle kinds
pub const SQL_HANDLE_ENV: SQLSMALLINT = 1;
pub const SQL_HANDLE_DBC: SQLSMALLINT = 2;
pub const SQL_HANDLE_STMT: SQLSMALLINT = 3;
pub const SQL_HANDLE_DESC: SQLSMALLINT = 4;

// Length sentinels
pub const SQL_NTS: SQLLEN = -3;
pub const SQL_NULL_DATA: SQLLEN = -1;

// SQLFreeStmt options
pub const SQL_CLOSE: SQLUSMALLINT = 0;
pub const SQL_DROP: SQLUSMALLINT = 1;
pub const SQL_RESET_PARAMS: SQLUSMALLINT = 3;

// Parameter direction
pub const SQL_PARAM_INPUT: SQLSMALLINT = 1;
pub const SQL_PARAM_OUTPUT: SQLSMALLINT = 4;

// Connection attributes
pub const SQL_ATTR_AUTOCOMMIT: SQLINTEGER = 102;
pub const SQL_AUTOCOMMIT_OFF: SQLULEN = 0;
pub const SQL_AUTOCOMMIT_ON: SQLULEN = 1;

// SQLDriverConnect completion
pub const SQL_DRIVER_NOPROMPT: SQLUSMALLINT = 0;
pub const SQL_DRIVER_COMPLETE: SQLUSMALLINT = 1;

// Nullability
pub const SQL_NULLABLE_UNKNOWN: SQLSMALLINT = 2;

// Column attributes
pub const SQL_COLUMN_DISPLAY_SIZE: SQLUSMALLINT = 6;
pub const SQL_COLUMN_UNSIGNED: SQLUSMALLINT = 8;
pub const SQL_COLUMN_LABEL: SQLUSMALLINT = 18;
pub const SQL_DESC_UNSIGNED: SQLUSMALLINT = SQL_COLUMN_UNSIGNED;

pub const SQL_FALSE: SQLLEN = 0;

// SQL data types
pub const SQL_CHAR: SQLSMALLINT = 1;
pub const SQL_NUMERIC: SQLSMALLINT = 2;
pub const SQL_DECIMAL: SQLSMALLINT = 3;
pub const SQL_INTEGER: SQLSMALLINT = 4;
pub const SQL_SMALLINT: SQLSMALLINT = 5;
pub const SQL_FLOAT: SQLSMALLINT = 6;
pub const SQL_REAL: SQLSMALLINT = 7;
pub const SQL_DOUBLE: SQLSMALLINT = 8;
pub const SQL_DATE: SQLSMALLINT = 9;
pub const SQL_TIME: SQLSMALLINT = 10;
pub const SQL_TIMESTAMP: SQLSMALLINT = 11;
pub const SQL_VARCHAR: SQLSMALLINT = 12;
pub const SQL_TYPE_DATE: SQLSMALLINT = 91;
pub const SQL_TYPE_TIME: SQLSMALLINT = 92;
pub const SQL_TYPE_TIMESTAMP: SQLSMALLINT = 93;
pub const SQL_LONGVARCHAR: SQLSMALLINT = -1;
pub const SQL_BINARY: SQLSMALLINT = -2;
pub const SQL_VARBINARY: SQLSMALLINT = -3;
pub const SQL_LONGVARBINARY: SQLSMALLINT = -4;
pub const SQL_BIGINT: SQLSMALLINT = -5;
pub const SQL_TINYINT: SQLSMALLINT = -6;
pub const SQL_BIT: SQLSMALLINT = -7;

// C data types
pub const SQL_C_CHAR: SQLSMALLINT = SQL_CHAR;
pub const SQL_C_NUMERIC: SQLSMALLINT = SQL_NUMERIC;
pub const SQL_C_LONG: SQLSMALLINT = SQL_INTEGER;
pub const SQL_C_SHORT: SQLSMALLINT = SQL_SMALLINT;
pub const SQL_C_FLOAT: SQLSMALLINT = SQL_REAL;
pub const SQL_C_DOUBLE: SQLSMALLINT = SQL_DOUBLE;
pub const SQL_C_DATE: SQLSMALLINT = SQL_DATE;
pub const SQL_C_TIME: SQLSMALLINT = SQL_TIME;
pub const SQL_C_TIMESTAMP: SQLSMALLINT = SQL_TIMESTAMP;
pub const SQL_C_TYPE_DATE: SQLSMALLINT = SQL_TYPE_DATE;
pub const SQL_C_TYPE_TIME: SQLSMALLINT = SQL_TYPE_TIME;
pub const SQL_C_TYPE_TIMESTAMP: SQLSMALLINT = SQL_TYPE_TIMESTAMP;
pub const SQL_C_BINARY: SQLSMALLINT = SQL_BINARY;
pub const SQL_C_BIT: SQLSMALLINT = SQL_BIT;
pub const SQL_C_TINYINT: SQLSMALLINT = SQL_TINYINT;
pub const SQL_C_SBIGINT: SQLSMALLINT = SQL_BIGINT - 20;
pub const SQL_C_SLONG: SQLSMALLINT = SQL_C_LONG - 20;
pub const SQL_C_SSHORT: SQLSMALLINT = SQL_C_SHORT - 20;
pub const SQL_C_STINYINT: SQLSMALLINT = SQL_TINYINT - 20;
pub const SQL_C_DEFAULT: SQLSMALLINT = 99;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlDateStruct {
    pub year: SQLSMALLINT,
    pub month: SQLUSMALLINT,
    pub day: SQLUSMALLINT,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlTimeStruct {
    pub hour: SQLUSMALLINT,
    pub minute: SQLUSMALLINT,
    pub second: SQLUSMALLINT,
}

/// `SQL_TIMESTAMP_STRUCT`; `fraction` is in nanoseconds.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlTimestampStruct {
    pub year: SQLSMALLINT,
    pub month: SQLUSMALLINT,
    pub day: SQLUSMALLINT,
    pub hour: SQLUSMALLINT,
    pub minute: SQLUSMALLINT,
    pub second: SQLUSMALLINT,
    pub fraction: SQLUINTEGER,
}

pub const SQL_MAX_NUMERIC_LEN: usize = 16;

/// `SQL_NUMERIC_STRUCT`: little-endian magnitude scaled by `10^scale`, `sign` 1 = positive.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlNumericStruct {
    pub precision: SQLCHAR,
    pub scale: SQLSCHAR,
    pub sign: SQLCHAR,
    pub val: [SQLCHAR; SQL_MAX_NUMERIC_LEN],
}
