use crate::bind::{self, ParamDescriptor};
use crate::convert::CType;
use crate::error::DriverError;
use crate::handle::Statement;
use crate::types::*;

/// Runs `sql` right away. Any previous result set, prepared statement and
/// parameters are dropped first.
pub fn exec_direct(stmt: &Statement, sql: &str) -> Result<SQLRETURN, DriverError> {
    let mut conn = stmt.conn.state();
    let native = conn.native.as_mut().ok_or(DriverError::NotConnected)?;
    let mut state = stmt.state();
    state.reset();

    let _span = tracing::debug_span!("exec_direct", sql).entered();
    let rs = native
        .query(sql)
        .map_err(|e| DriverError::engine("failed to query", e))?;
    tracing::debug!(
        fields = rs.field_count(),
        affected = rs.affected_rows(),
        "query executed"
    );
    state.result = Some(rs);
    Ok(SQL_SUCCESS)
}

pub fn prepare(stmt: &Statement, sql: &str) -> Result<SQLRETURN, DriverError> {
    let mut conn = stmt.conn.state();
    let native = conn.native.as_mut().ok_or(DriverError::NotConnected)?;
    let mut state = stmt.state();
    state.reset();

    let mut prepared = native
        .stmt_init()
        .map_err(|e| DriverError::engine("failed to initialize statement internally", e))?;
    prepared
        .prepare(sql)
        .map_err(|e| DriverError::engine("failed to prepare a statement", e))?;
    tracing::debug!(sql, "statement prepared");
    state.prepared = Some(prepared);
    Ok(SQL_SUCCESS)
}

#[allow(clippy::too_many_arguments)]
pub fn bind_parameter(
    stmt: &Statement,
    index: SQLUSMALLINT,
    direction: SQLSMALLINT,
    value_type: SQLSMALLINT,
    sql_type: SQLSMALLINT,
    length_precision: SQLULEN,
    scale: SQLSMALLINT,
    value: SQLPOINTER,
    buffer_length: SQLLEN,
    indicator: *mut SQLLEN,
) -> Result<SQLRETURN, DriverError> {
    stmt.require_connection()?;
    let mut state = stmt.state();
    if state.prepared.is_none() {
        return Err(DriverError::NoStatement);
    }
    if direction != SQL_PARAM_INPUT {
        return Err(DriverError::not_supported(format!(
            "non-input parameter [@{index}] not supported yet"
        )));
    }
    if index == 0 {
        return Err(DriverError::ParameterZero);
    }

    let unsupported = || {
        DriverError::not_supported(format!(
            "parameter [@{index}] of SQL_C_TYPE [{value_type}] as SQL_TYPE [{sql_type}] not supported"
        ))
    };
    let c_type = CType::from_code(value_type).ok_or_else(unsupported)?;
    let wire_type = bind::resolve(c_type, sql_type).ok_or_else(unsupported)?;

    state.params.bind(
        index as usize,
        ParamDescriptor {
            c_type,
            sql_type,
            wire_type,
            length_precision,
            scale,
            value,
            buffer_length,
            indicator,
        },
    );
    tracing::trace!(index, %wire_type, "parameter bound");
    Ok(SQL_SUCCESS)
}

/// Runs the prepared statement with the current parameter values.
///
/// # Safety
///
/// Every bound parameter buffer must still be valid.
pub unsafe fn execute(stmt: &Statement) -> Result<SQLRETURN, DriverError> {
    stmt.require_connection()?;
    let mut guard = stmt.state();
    let state = &mut *guard;
    state.close_result();

    let prepared = state.prepared.as_mut().ok_or(DriverError::NoStatement)?;
    if !state.params.is_empty() {
        let binds = state.params.materialize()?;
        prepared
            .bind_params(binds)
            .map_err(|e| DriverError::engine("failed to bind parameters", e))?;
        prepared
            .add_batch()
            .map_err(|e| DriverError::engine("failed to add batch", e))?;
    }
    prepared
        .execute()
        .map_err(|e| DriverError::engine("failed to execute statement", e))?;
    let rs = prepared
        .use_result()
        .map_err(|e| DriverError::engine("failed to execute statement", e))?;
    tracing::debug!(
        params = state.params.len(),
        affected = rs.affected_rows(),
        "statement executed"
    );
    state.result = Some(rs);
    Ok(SQL_SUCCESS)
}
