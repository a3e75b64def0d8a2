//! Environment → Connection → Statement ownership tree.
//!
//! Handles given to the application are `Arc::into_raw` pointers. A child
//! holds a strong reference to its parent, so a parent's strong count is one
//! plus its live children. Freeing requires the count to be exactly one; any
//! other count means the application broke the ownership contract, and the
//! driver panics (which aborts at the `extern "C"` boundary). A handle that
//! passed that check has no children and no other owner, so nothing can
//! allocate under it while it is torn down.

use crate::bind::ParamSet;
use crate::diagnostics::ErrorContext;
use crate::engine::{ConnectParams, Field, NativeConnection, NativeStatement, ResultSet, Row};
use crate::error::DriverError;
use crate::types::*;
use parking_lot::{Mutex, MutexGuard};
use std::mem::ManuallyDrop;
use std::sync::Arc;

/// Environment handle
#[derive(Debug, Default)]
pub struct Environment {
    pub errors: ErrorContext,
}

/// Connection handle
pub struct Connection {
    pub env: Arc<Environment>,
    pub errors: ErrorContext,
    state: Mutex<ConnectionState>,
}

#[derive(Default)]
pub struct ConnectionState {
    pub native: Option<Box<dyn NativeConnection>>,
    pub target: Option<ConnectParams>,
}

/// Statement handle
pub struct Statement {
    pub conn: Arc<Connection>,
    pub errors: ErrorContext,
    state: Mutex<StatementState>,
}

/// Field order is drop order: the cursor row and result set go before the
/// prepared statement that produced them.
#[derive(Default)]
pub struct StatementState {
    pub row: Option<Row>,
    pub result: Option<Box<dyn ResultSet>>,
    pub prepared: Option<Box<dyn NativeStatement>>,
    pub params: ParamSet,
}

impl StatementState {
    /// Drops the result set, the prepared statement and all parameters.
    pub fn reset(&mut self) {
        self.close_result();
        self.prepared = None;
        self.params.clear();
    }

    pub fn close_result(&mut self) {
        self.row = None;
        self.result = None;
    }

    pub fn result(&mut self) -> Result<&mut Box<dyn ResultSet>, DriverError> {
        self.result.as_mut().ok_or(DriverError::NoResultSet)
    }

    pub fn fields(&self) -> Result<&[Field], DriverError> {
        self.result
            .as_ref()
            .map(|rs| rs.fields())
            .ok_or(DriverError::NoResultSet)
    }
}

impl Connection {
    pub fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().native.is_some()
    }
}

impl Statement {
    pub fn state(&self) -> MutexGuard<'_, StatementState> {
        self.state.lock()
    }

    pub fn require_connection(&self) -> Result<(), DriverError> {
        if self.conn.is_connected() {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }
}

// ── Allocation ──────────────────────────────────────────────────────

pub fn alloc_environment() -> Arc<Environment> {
    crate::runtime::init();
    let env = Arc::new(Environment::default());
    tracing::debug!(env = ?Arc::as_ptr(&env), "environment allocated");
    env
}

/// The parent reference is taken first and travels into the child, so a
/// child that fails to materialize gives it back on unwind.
pub fn alloc_connection(env: &Arc<Environment>) -> Arc<Connection> {
    let conn = Arc::new(Connection {
        env: Arc::clone(env),
        errors: ErrorContext::default(),
        state: Mutex::new(ConnectionState::default()),
    });
    tracing::debug!(conn = ?Arc::as_ptr(&conn), env_refs = Arc::strong_count(env), "connection allocated");
    conn
}

pub fn alloc_statement(conn: &Arc<Connection>) -> Arc<Statement> {
    let stmt = Arc::new(Statement {
        conn: Arc::clone(conn),
        errors: ErrorContext::default(),
        state: Mutex::new(StatementState::default()),
    });
    tracing::debug!(stmt = ?Arc::as_ptr(&stmt), conn_refs = Arc::strong_count(conn), "statement allocated");
    stmt
}

// ── Teardown ────────────────────────────────────────────────────────

fn contract_violation(what: &str) -> ! {
    tracing::error!("handle contract violated: {what}");
    panic!("handle contract violated: {what}");
}

fn require_sole_owner<T>(handle: &Arc<T>, kind: &str) {
    let refs = Arc::strong_count(handle);
    if refs != 1 {
        contract_violation(&format!("{kind} freed with reference count {refs}"));
    }
}

pub fn free_environment(env: Arc<Environment>) {
    require_sole_owner(&env, "environment");
    tracing::debug!(env = ?Arc::as_ptr(&env), "environment freed");
}

/// Drops the native connection, if any, and the environment reference.
pub fn free_connection(conn: Arc<Connection>) {
    require_sole_owner(&conn, "connection");
    if conn.state().native.take().is_some() {
        tracing::info!("connection freed while still connected");
    }
    tracing::debug!(conn = ?Arc::as_ptr(&conn), "connection freed");
}

/// Drops the result set, the prepared statement, the parameters and the
/// connection reference.
pub fn free_statement(stmt: Arc<Statement>) {
    require_sole_owner(&stmt, "statement");
    stmt.state().reset();
    tracing::debug!(stmt = ?Arc::as_ptr(&stmt), "statement freed");
}

// ── Raw handle plumbing ─────────────────────────────────────────────

pub fn into_raw<T>(handle: Arc<T>) -> SQLHANDLE {
    Arc::into_raw(handle) as SQLHANDLE
}

/// # Safety
///
/// `handle` must come from [`into_raw`] for the same `T` and still be live.
pub unsafe fn borrow<'a, T>(handle: SQLHANDLE) -> &'a T {
    &*(handle as *const T)
}

/// Takes back the application's reference.
///
/// # Safety
///
/// As [`borrow`]; the raw handle must not be used afterwards.
pub unsafe fn take<T>(handle: SQLHANDLE) -> Arc<T> {
    Arc::from_raw(handle as *const T)
}

/// A new strong reference, leaving the application's reference in place.
///
/// # Safety
///
/// As [`borrow`].
pub unsafe fn share<T>(handle: SQLHANDLE) -> Arc<T> {
    Arc::increment_strong_count(handle as *const T);
    Arc::from_raw(handle as *const T)
}

/// Current reference count of a live handle: the application's reference
/// plus one per live child.
///
/// # Safety
///
/// As [`borrow`].
pub unsafe fn ref_count<T>(handle: SQLHANDLE) -> usize {
    let arc = ManuallyDrop::new(Arc::from_raw(handle as *const T));
    Arc::strong_count(&arc)
}
