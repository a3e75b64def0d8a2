use crate::convert::{self, CType, Target};
use crate::engine::{Field, WireType};
use crate::error::DriverError;
use crate::handle::Statement;
use crate::types::*;

/// Advances the cursor. Past the last row the current row is cleared and
/// `SQL_NO_DATA` returned.
pub fn fetch(stmt: &Statement) -> Result<SQLRETURN, DriverError> {
    stmt.require_connection()?;
    let mut guard = stmt.state();
    let state = &mut *guard;
    let rs = state.result.as_mut().ok_or(DriverError::NoResultSet)?;
    match rs.fetch_row() {
        Some(row) => {
            state.row = Some(row);
            Ok(SQL_SUCCESS)
        }
        None => {
            if state.row.take().is_some() {
                tracing::debug!("result set exhausted");
            }
            Ok(SQL_NO_DATA)
        }
    }
}

/// Converts one cell of the current row into the caller's buffer.
///
/// # Safety
///
/// `target_value` must point to at least `buffer_length` writable bytes, or
/// to a value of the fixed C width for fixed-width targets. `indicator` may
/// be null.
pub unsafe fn get_data(
    stmt: &Statement,
    column: SQLUSMALLINT,
    target_type: SQLSMALLINT,
    target_value: SQLPOINTER,
    buffer_length: SQLLEN,
    indicator: *mut SQLLEN,
) -> Result<SQLRETURN, DriverError> {
    stmt.require_connection()?;
    let state = stmt.state();
    let fields = state.fields()?;
    let row = state.row.as_ref().ok_or(DriverError::NoCurrentRow)?;
    if column == 0 {
        return Err(DriverError::WholeRow);
    }
    if fields.is_empty() {
        return Err(DriverError::NoFields);
    }
    let idx = column as usize - 1;
    let field = fields.get(idx).ok_or(DriverError::ColumnOverflow(column))?;

    let indicator = indicator.as_mut();
    let Some(cell) = row.get(idx).and_then(|c| c.as_deref()) else {
        if let Some(ind) = indicator {
            *ind = SQL_NULL_DATA;
        }
        return Ok(SQL_SUCCESS);
    };

    let c_code = if target_type == SQL_C_DEFAULT {
        CType::default_for(field.wire_type).code()
    } else {
        target_type
    };
    let len = match CType::from_code(c_code).and_then(CType::width) {
        Some(width) => width,
        None => buffer_length.max(0) as usize,
    };
    let buf: &mut [u8] = if target_value.is_null() {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(target_value as *mut u8, len)
    };

    let mut target = Target::new(buf, indicator);
    match convert::convert(field.wire_type, cell, c_code, &mut target)? {
        None => Ok(SQL_SUCCESS),
        Some(info) => Err(info),
    }
}

pub fn num_result_cols(stmt: &Statement) -> Result<usize, DriverError> {
    Ok(stmt.state().fields()?.len())
}

pub fn row_count(stmt: &Statement) -> Result<i64, DriverError> {
    Ok(stmt.state().result()?.affected_rows())
}

/// SQL type reported for a wire type.
pub fn sql_type_of(wire: WireType) -> SQLSMALLINT {
    match wire {
        WireType::Bool => SQL_BIT,
        WireType::TinyInt => SQL_TINYINT,
        WireType::SmallInt => SQL_SMALLINT,
        WireType::Int => SQL_INTEGER,
        WireType::BigInt => SQL_BIGINT,
        WireType::Float => SQL_REAL,
        WireType::Double => SQL_DOUBLE,
        WireType::Timestamp => SQL_TYPE_TIMESTAMP,
        WireType::Binary => SQL_VARBINARY,
        WireType::NChar | WireType::Null => SQL_VARCHAR,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: SQLSMALLINT,
    pub column_size: SQLULEN,
    pub decimal_digits: SQLSMALLINT,
    pub nullable: SQLSMALLINT,
}

impl From<&Field> for ColumnDescription {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            data_type: sql_type_of(field.wire_type),
            column_size: field.payload_width() as SQLULEN,
            decimal_digits: if field.wire_type == WireType::Timestamp { 3 } else { 0 },
            nullable: SQL_NULLABLE_UNKNOWN,
        }
    }
}

pub fn describe_col(stmt: &Statement, column: SQLUSMALLINT) -> Result<ColumnDescription, DriverError> {
    let state = stmt.state();
    let fields = state.fields()?;
    if column == 0 || column as usize > fields.len() {
        return Err(DriverError::ColumnOutOfRange(column));
    }
    Ok(ColumnDescription::from(&fields[column as usize - 1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_maps_types_and_widths() {
        let ts = ColumnDescription::from(&Field::new("ts", WireType::Timestamp, 8));
        assert_eq!(ts.data_type, SQL_TYPE_TIMESTAMP);
        assert_eq!(ts.column_size, 8);
        assert_eq!(ts.decimal_digits, 3);
        assert_eq!(ts.nullable, SQL_NULLABLE_UNKNOWN);

        let name = ColumnDescription::from(&Field::new("name", WireType::NChar, 22));
        assert_eq!(name.data_type, SQL_VARCHAR);
        assert_eq!(name.column_size, 20);
        assert_eq!(name.decimal_digits, 0);

        assert_eq!(sql_type_of(WireType::Float), SQL_REAL);
        assert_eq!(sql_type_of(WireType::Binary), SQL_VARBINARY);
        assert_eq!(sql_type_of(WireType::Bool), SQL_BIT);
    }
}
