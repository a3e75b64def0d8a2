#![allow(dead_code)]

use std::ptr;
use tsodbc::types::*;
use tsodbc::*;

pub struct Session {
    pub env: SQLHENV,
    pub dbc: SQLHDBC,
    pub stmt: SQLHSTMT,
}

impl Session {
    pub fn open() -> Self {
        let mut env: SQLHENV = ptr::null_mut();
        let mut dbc: SQLHDBC = ptr::null_mut();
        let mut stmt: SQLHSTMT = ptr::null_mut();
        assert_eq!(SQLAllocHandle(SQL_HANDLE_ENV, ptr::null_mut(), &mut env), SQL_SUCCESS);
        assert_eq!(SQLAllocHandle(SQL_HANDLE_DBC, env, &mut dbc), SQL_SUCCESS);
        assert_eq!(connect(dbc, "root", "taosdata"), SQL_SUCCESS);
        assert_eq!(SQLAllocHandle(SQL_HANDLE_STMT, dbc, &mut stmt), SQL_SUCCESS);
        Session { env, dbc, stmt }
    }

    pub fn exec(&self, sql: &str) -> SQLRETURN {
        SQLExecDirect(self.stmt, sql.as_ptr(), sql.len() as SQLINTEGER)
    }

    pub fn exec_ok(&self, sql: &str) {
        let rc = self.exec(sql);
        assert_eq!(rc, SQL_SUCCESS, "{sql}: {:?}", diag(SQL_HANDLE_STMT, self.stmt));
    }

    pub fn prepare(&self, sql: &str) -> SQLRETURN {
        SQLPrepare(self.stmt, sql.as_ptr(), sql.len() as SQLINTEGER)
    }

    pub fn stmt_diag(&self) -> Option<Diag> {
        diag(SQL_HANDLE_STMT, self.stmt)
    }

    /// Current row's column as text, `None` for NULL.
    pub fn text(&self, col: SQLUSMALLINT) -> Option<String> {
        let mut buf = [0u8; 256];
        let mut ind: SQLLEN = 0;
        let rc = SQLGetData(
            self.stmt,
            col,
            SQL_C_CHAR,
            buf.as_mut_ptr() as SQLPOINTER,
            buf.len() as SQLLEN,
            &mut ind,
        );
        assert_eq!(rc, SQL_SUCCESS, "{:?}", self.stmt_diag());
        if ind == SQL_NULL_DATA {
            return None;
        }
        Some(String::from_utf8_lossy(&buf[..ind as usize]).into_owned())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        SQLFreeHandle(SQL_HANDLE_STMT, self.stmt);
        SQLDisconnect(self.dbc);
        SQLFreeHandle(SQL_HANDLE_DBC, self.dbc);
        SQLFreeHandle(SQL_HANDLE_ENV, self.env);
    }
}

pub fn connect(dbc: SQLHDBC, user: &str, auth: &str) -> SQLRETURN {
    let host = "localhost";
    SQLConnect(
        dbc,
        host.as_ptr(),
        host.len() as SQLSMALLINT,
        user.as_ptr(),
        user.len() as SQLSMALLINT,
        auth.as_ptr(),
        auth.len() as SQLSMALLINT,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub state: String,
    pub native: i32,
    pub message: String,
}

pub fn diag(handle_type: SQLSMALLINT, handle: SQLHANDLE) -> Option<Diag> {
    let mut state = [0u8; 6];
    let mut native: SQLINTEGER = 0;
    let mut msg = [0u8; 512];
    let mut len: SQLSMALLINT = 0;
    let rc = SQLGetDiagRec(
        handle_type,
        handle,
        1,
        state.as_mut_ptr(),
        &mut native,
        msg.as_mut_ptr(),
        msg.len() as SQLSMALLINT,
        &mut len,
    );
    if rc == SQL_NO_DATA {
        return None;
    }
    assert_eq!(rc, SQL_SUCCESS);
    Some(Diag {
        state: String::from_utf8_lossy(&state[..5]).into_owned(),
        native,
        message: String::from_utf8_lossy(&msg[..len as usize]).into_owned(),
    })
}

/// Table name unique to the calling test.
pub fn table(prefix: &str) -> String {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    format!("{prefix}_{}_{}", std::process::id(), NEXT.fetch_add(1, Ordering::Relaxed))
}
