//! Boundary with the time-series query engine.
//!
//! The driver never talks to a server itself. Everything it needs from the
//! engine goes through the traits below: connect, ad-hoc query, the
//! prepare/bind/add-batch/execute cycle and row-at-a-time result sets whose
//! cells are raw bytes tagged with a [`WireType`].

pub mod loopback;

use thiserror::Error;

pub use loopback::LoopbackEngine;

/// Length prefix carried by variable-width fields in the declared byte width.
pub const VARSTR_HEADER_SIZE: usize = 2;

/// Engine column / cell type tags.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Null = 0,
    Bool = 1,
    TinyInt = 2,
    SmallInt = 3,
    Int = 4,
    BigInt = 5,
    Float = 6,
    Double = 7,
    Binary = 8,
    /// Milliseconds since the Unix epoch.
    Timestamp = 9,
    NChar = 10,
}

impl WireType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            WireType::Null => "NULL",
            WireType::Bool => "BOOL",
            WireType::TinyInt => "TINYINT",
            WireType::SmallInt => "SMALLINT",
            WireType::Int => "INT",
            WireType::BigInt => "BIGINT",
            WireType::Float => "FLOAT",
            WireType::Double => "DOUBLE",
            WireType::Binary => "BINARY",
            WireType::Timestamp => "TIMESTAMP",
            WireType::NChar => "NCHAR",
        }
    }

    /// Byte width of a fixed-width cell, `None` for variable-width types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::Null => Some(0),
            WireType::Bool | WireType::TinyInt => Some(1),
            WireType::SmallInt => Some(2),
            WireType::Int | WireType::Float => Some(4),
            WireType::BigInt | WireType::Double | WireType::Timestamp => Some(8),
            WireType::Binary | WireType::NChar => None,
        }
    }

    pub fn is_variable(self) -> bool {
        self.fixed_width().is_none()
    }
}

impl std::fmt::Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name(), self.code())
    }
}

/// Result set column as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub wire_type: WireType,
    /// Declared width; includes [`VARSTR_HEADER_SIZE`] for variable-width types.
    pub bytes: usize,
}

impl Field {
    pub fn new(name: impl Into<String>, wire_type: WireType, bytes: usize) -> Self {
        Self {
            name: name.into(),
            wire_type,
            bytes,
        }
    }

    /// Width visible to the caller: the declared width minus the length header.
    pub fn payload_width(&self) -> usize {
        if self.wire_type.is_variable() {
            self.bytes.saturating_sub(VARSTR_HEADER_SIZE)
        } else {
            self.bytes
        }
    }
}

/// One fetched row: a cell per field, `None` for SQL NULL.
///
/// Fixed-width cells hold the little-endian value; variable-width cells hold
/// the payload without its length header.
pub type Row = Vec<Option<Vec<u8>>>;

/// Wire-ready parameter value handed to [`NativeStatement::bind_params`].
#[derive(Debug, Clone, PartialEq)]
pub struct WireBind {
    pub buffer_type: WireType,
    pub buffer: Vec<u8>,
    pub length: usize,
    pub is_null: bool,
}

impl WireBind {
    pub fn null(buffer_type: WireType) -> Self {
        Self {
            buffer_type,
            buffer: Vec::new(),
            length: 0,
            is_null: true,
        }
    }

    pub fn value(buffer_type: WireType, buffer: Vec<u8>) -> Self {
        let length = buffer.len();
        Self {
            buffer_type,
            buffer,
            length,
            is_null: false,
        }
    }

    /// Placeholder for a declared but not yet materialized slot.
    pub fn unset() -> Self {
        Self::null(WireType::Null)
    }
}

/// Error reported by the engine, carrying its native code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (code 0x{code:04x})")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Connect target after DSN / connection-string resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub user: String,
    pub auth: String,
    pub database: String,
    /// 0 selects the engine default.
    pub port: u16,
}

pub trait Engine: Send + Sync {
    /// One-time process initialization. Called once, before the first connect.
    fn init(&self) -> Result<(), EngineError>;

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn NativeConnection>, EngineError>;
}

pub trait NativeConnection {
    fn query(&mut self, sql: &str) -> Result<Box<dyn ResultSet>, EngineError>;

    fn stmt_init(&mut self) -> Result<Box<dyn NativeStatement>, EngineError>;
}

pub trait NativeStatement {
    fn prepare(&mut self, sql: &str) -> Result<(), EngineError>;

    fn bind_params(&mut self, binds: &[WireBind]) -> Result<(), EngineError>;

    fn add_batch(&mut self) -> Result<(), EngineError>;

    fn execute(&mut self) -> Result<(), EngineError>;

    /// Hands over the result of the last `execute`.
    fn use_result(&mut self) -> Result<Box<dyn ResultSet>, EngineError>;
}

/// An active result set. Dropping it frees the engine-side resources.
pub trait ResultSet {
    fn fields(&self) -> &[Field];

    fn field_count(&self) -> usize {
        self.fields().len()
    }

    /// Next row, or `None` once exhausted.
    fn fetch_row(&mut self) -> Option<Row>;

    fn affected_rows(&self) -> i64;
}
