use crate::engine::{EngineError, WireType};
use crate::types::*;
use thiserror::Error;

/// Native error codes recorded next to the SQLSTATE.
pub mod code {
    pub const OPS_NOT_SUPPORT: i32 = 0x0100;
    pub const RPC_NETWORK_UNAVAIL: i32 = 0x000B;
    pub const TSC_INVALID_SQL: i32 = 0x0200;
    pub const TSC_INVALID_CONNECTION: i32 = 0x020B;
    pub const TSC_QUERY_CACHE_ERASED: i32 = 0x020E;
    pub const TSC_APP_ERROR: i32 = 0x0211;
    pub const MND_FIELD_NOT_EXIST: i32 = 0x036C;
    pub const ODBC_OOM: i32 = 0x2100;
    pub const ODBC_CONV_CHAR_NOT_NUM: i32 = 0x2101;
    pub const ODBC_CONV_UNDEF: i32 = 0x2102;
    pub const ODBC_CONV_TRUNC_FRAC: i32 = 0x2103;
    pub const ODBC_CONV_TRUNC: i32 = 0x2104;
    pub const ODBC_CONV_NOT_SUPPORT: i32 = 0x2105;
    pub const ODBC_CONV_OOR: i32 = 0x2106;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Completed, information was lost on the way.
    Info,
    Error,
}

#[derive(Debug, Error)]
pub enum DriverError {
    // === Resources ===
    #[error("failed to allocate resources")]
    OutOfMemory,

    // === Connection state ===
    #[error("connection still in use")]
    ConnectionInUse,

    #[error("no connection to data source yet")]
    NotConnected,

    #[error("failed to connect to data source: {0}")]
    ConnectFailed(#[source] EngineError),

    #[error("unrecognized connection string: [{0}]")]
    BadConnectionString(String),

    #[error("option[{0}] other than SQL_DRIVER_NOPROMPT not supported yet")]
    DriverCompletion(SQLUSMALLINT),

    // === Statement state ===
    #[error("no statement cached or not ready")]
    NoStatement,

    #[error("no result set cached or not ready")]
    NoResultSet,

    #[error("no rows cached or not ready")]
    NoCurrentRow,

    #[error("no fields in result set")]
    NoFields,

    // === Arguments ===
    #[error("ColumnNumber[0] not supported")]
    WholeRow,

    #[error("ColumnNumber[{0}] overflow")]
    ColumnOverflow(SQLUSMALLINT),

    #[error("ColumnNumber[{0}] not in valid range")]
    ColumnOutOfRange(SQLUSMALLINT),

    #[error("ParameterNumber[0] underflow")]
    ParameterZero,

    #[error("default parameter [@{0}] not supported yet")]
    UnboundParameter(usize),

    #[error("value [@{0}] bad StrLen_or_Ind")]
    BadLength(usize),

    #[error("value [@{index}] length {len} exceeds declared size {max}")]
    ParameterTooLong { index: usize, len: usize, max: usize },

    #[error("{0}")]
    NotSupported(String),

    // === Conversions ===
    #[error("conversion from TSDB_DATA_TYPE {from} to SQL_C_TYPE [{to}] not supported")]
    ConversionNotSupported { from: WireType, to: SQLSMALLINT },

    #[error("string data, right truncated")]
    StringTruncated,

    #[error("fractional truncation")]
    FractionalTruncated,

    #[error("numeric value out of range: {0}")]
    OutOfRange(String),

    #[error("invalid character value for cast specification: {0}")]
    InvalidCharValue(String),

    #[error("datetime field overflow: {0}")]
    DatetimeOverflow(String),

    // === Engine ===
    #[error("{context}: {source}")]
    Engine {
        context: &'static str,
        #[source]
        source: EngineError,
    },
}

impl DriverError {
    pub fn engine(context: &'static str, source: EngineError) -> Self {
        DriverError::Engine { context, source }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        DriverError::NotSupported(message.into())
    }

    pub fn sqlstate(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "HY001",
            Self::ConnectionInUse => "08002",
            Self::NotConnected => "08003",
            Self::ConnectFailed(_) | Self::BadConnectionString(_) => "08001",
            Self::DriverCompletion(_) => "HY110",
            Self::NoStatement => "HY010",
            Self::NoResultSet | Self::NoCurrentRow => "24000",
            Self::NoFields => "HY000",
            Self::WholeRow | Self::NotSupported(_) => "HYC00",
            Self::ColumnOverflow(_) | Self::ColumnOutOfRange(_) | Self::ParameterZero => "07009",
            Self::UnboundParameter(_) => "07002",
            Self::BadLength(_) => "HY090",
            Self::ParameterTooLong { .. } => "22001",
            Self::ConversionNotSupported { .. } => "07006",
            Self::StringTruncated => "01004",
            Self::FractionalTruncated => "01S07",
            Self::OutOfRange(_) => "22003",
            Self::InvalidCharValue(_) => "22018",
            Self::DatetimeOverflow(_) => "22008",
            Self::Engine { .. } => "HY000",
        }
    }

    pub fn native_code(&self) -> i32 {
        match self {
            Self::OutOfMemory => code::ODBC_OOM,
            Self::ConnectionInUse
            | Self::DriverCompletion(_)
            | Self::ColumnOverflow(_)
            | Self::ParameterZero
            | Self::ParameterTooLong { .. } => code::TSC_APP_ERROR,
            Self::NotConnected => code::TSC_INVALID_CONNECTION,
            Self::ConnectFailed(e) | Self::Engine { source: e, .. } => e.code,
            Self::BadConnectionString(_) => code::RPC_NETWORK_UNAVAIL,
            Self::NoStatement => code::TSC_INVALID_SQL,
            Self::NoResultSet | Self::NoCurrentRow => code::TSC_QUERY_CACHE_ERASED,
            Self::NoFields | Self::ColumnOutOfRange(_) => code::MND_FIELD_NOT_EXIST,
            Self::WholeRow
            | Self::UnboundParameter(_)
            | Self::BadLength(_)
            | Self::NotSupported(_) => code::OPS_NOT_SUPPORT,
            Self::ConversionNotSupported { .. } => code::ODBC_CONV_NOT_SUPPORT,
            Self::StringTruncated => code::ODBC_CONV_TRUNC,
            Self::FractionalTruncated => code::ODBC_CONV_TRUNC_FRAC,
            Self::OutOfRange(_) => code::ODBC_CONV_OOR,
            Self::InvalidCharValue(_) => code::ODBC_CONV_CHAR_NOT_NUM,
            Self::DatetimeOverflow(_) => code::ODBC_CONV_UNDEF,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::StringTruncated | Self::FractionalTruncated => Severity::Info,
            _ => Severity::Error,
        }
    }

    pub fn return_code(&self) -> SQLRETURN {
        match self.severity() {
            Severity::Info => SQL_SUCCESS_WITH_INFO,
            Severity::Error => SQL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_info() {
        assert_eq!(DriverError::StringTruncated.return_code(), SQL_SUCCESS_WITH_INFO);
        assert_eq!(DriverError::FractionalTruncated.sqlstate(), "01S07");
        assert_eq!(
            DriverError::OutOfRange("x".into()).return_code(),
            SQL_ERROR
        );
    }

    #[test]
    fn engine_errors_keep_engine_code() {
        let e = DriverError::engine("failed to query", EngineError::new(0x0362, "no table"));
        assert_eq!(e.native_code(), 0x0362);
        assert_eq!(e.to_string(), "failed to query: no table (code 0x0362)");
    }

    #[test]
    fn conversion_message_names_both_types() {
        let e = DriverError::ConversionNotSupported {
            from: WireType::Binary,
            to: SQL_C_LONG,
        };
        assert_eq!(
            e.to_string(),
            "conversion from TSDB_DATA_TYPE BINARY [8] to SQL_C_TYPE [4] not supported"
        );
    }
}
