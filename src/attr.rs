use crate::engine::{Field, WireType, VARSTR_HEADER_SIZE};
use crate::error::DriverError;
use crate::handle::{Connection, Statement};
use crate::types::*;

/// Only autocommit, and only switched on, is accepted.
pub fn set_connect_attr(
    _conn: &Connection,
    attribute: SQLINTEGER,
    value: SQLPOINTER,
) -> Result<SQLRETURN, DriverError> {
    if attribute != SQL_ATTR_AUTOCOMMIT {
        tracing::warn!(attribute, "unsupported connection attribute");
        return Err(DriverError::not_supported(
            "Attribute other than SQL_ATTR_AUTOCOMMIT not supported yet",
        ));
    }
    if value as SQLULEN != SQL_AUTOCOMMIT_ON {
        return Err(DriverError::not_supported(
            "Attribute Value other than SQL_AUTOCOMMIT_ON not supported yet",
        ));
    }
    Ok(SQL_SUCCESS)
}

/// Characters needed to display a value of the field.
pub fn display_size(field: &Field) -> SQLLEN {
    match field.wire_type {
        WireType::Bool => 7,
        WireType::TinyInt => 5,
        WireType::SmallInt => 7,
        WireType::Int => 12,
        WireType::BigInt => 22,
        WireType::Float => 12,
        WireType::Double => 20,
        WireType::Timestamp => 26,
        WireType::Binary | WireType::NChar => {
            3 * field.bytes.saturating_sub(VARSTR_HEADER_SIZE) as SQLLEN + 2
        }
        WireType::Null => 10,
    }
}

/// One column attribute, either numeric or character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnAttribute {
    Numeric(SQLLEN),
    Text(String),
}

pub fn column_attribute(
    stmt: &Statement,
    column: SQLUSMALLINT,
    field_id: SQLUSMALLINT,
) -> Result<ColumnAttribute, DriverError> {
    let state = stmt.state();
    let fields = state.fields()?;
    if column == 0 {
        return Err(DriverError::WholeRow);
    }
    if fields.is_empty() {
        return Err(DriverError::NoFields);
    }
    let field = fields
        .get(column as usize - 1)
        .ok_or(DriverError::ColumnOverflow(column))?;

    match field_id {
        SQL_COLUMN_DISPLAY_SIZE => Ok(ColumnAttribute::Numeric(display_size(field))),
        SQL_COLUMN_LABEL => Ok(ColumnAttribute::Text(field.name.clone())),
        SQL_COLUMN_UNSIGNED => Ok(ColumnAttribute::Numeric(SQL_FALSE)),
        other => {
            tracing::warn!(field_id = other, "unsupported column attribute");
            Err(DriverError::not_supported(format!(
                "FieldIdentifier[{other}] not supported yet"
            )))
        }
    }
}
