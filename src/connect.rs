use crate::engine::ConnectParams;
use crate::error::DriverError;
use crate::handle::Connection;
use crate::runtime;
use crate::types::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Keys recognised in a `SQLDriverConnect` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pub dsn: String,
    pub uid: String,
    pub pwd: String,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
}

/// Parses `KEY=VALUE;...`. Keys are case-insensitive, unknown keys are
/// ignored and `DSN` is required.
pub fn parse_connection_string(conn_str: &str) -> Result<ConnectionString, DriverError> {
    let mut parsed = ConnectionString::default();
    let mut has_dsn = false;

    for part in conn_str.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some(idx) = part.find('=') else {
            return Err(DriverError::BadConnectionString(conn_str.to_string()));
        };
        let key = part[..idx].trim().to_lowercase();
        let val = part[idx + 1..].trim().to_string();
        match key.as_str() {
            "dsn" => {
                parsed.dsn = val;
                has_dsn = true;
            }
            "uid" => parsed.uid = val,
            "pwd" => parsed.pwd = val,
            "server" | "host" => {
                let (host, port) = split_host_port(&val);
                parsed.server = Some(host);
                if port.is_some() {
                    parsed.port = port;
                }
            }
            "port" => parsed.port = val.parse().ok(),
            "database" | "db" => parsed.database = Some(val),
            _ => {}
        }
    }

    if !has_dsn {
        return Err(DriverError::BadConnectionString(conn_str.to_string()));
    }
    Ok(parsed)
}

/// `host`, `host:port` or `host,port`.
fn split_host_port(val: &str) -> (String, Option<u16>) {
    match val.rfind([',', ':']) {
        Some(idx) => match val[idx + 1..].trim().parse() {
            Ok(port) => (val[..idx].trim().to_string(), Some(port)),
            Err(_) => (val.to_string(), None),
        },
        None => (val.to_string(), None),
    }
}

/// `$ODBCINI`, `~/.odbc.ini`, `/etc/odbc.ini`, in lookup order.
pub fn odbc_ini_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(p) = std::env::var("ODBCINI") {
        if !p.is_empty() {
            paths.push(PathBuf::from(p));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        paths.push(Path::new(&home).join(".odbc.ini"));
    }
    paths.push(PathBuf::from("/etc/odbc.ini"));
    paths
}

/// Properties of section `[dsn]` from the first file that has one, keys
/// lowercased. `Driver` and `Description` are dropped.
pub fn resolve_dsn(dsn: &str, paths: &[PathBuf]) -> HashMap<String, String> {
    let mut props = HashMap::new();
    for path in paths {
        let Ok(content) = std::fs::read_to_string(path) else {
            continue;
        };
        let mut in_section = false;
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_section = line[1..line.len() - 1].trim() == dsn;
            } else if in_section {
                if let Some(idx) = line.find('=') {
                    let key = line[..idx].trim().to_lowercase();
                    let val = line[idx + 1..].trim().to_string();
                    props.insert(key, val);
                }
            }
        }
        if !props.is_empty() {
            tracing::debug!(dsn, path = %path.display(), "DSN resolved");
            break;
        }
    }
    props.retain(|k, _| k != "driver" && k != "description");
    props
}

/// Builds the engine target for `dsn`. Without a matching section the name
/// itself is the host; an empty name falls back to the configured default.
pub fn target_params(dsn: &str, user: &str, auth: &str, paths: &[PathBuf]) -> ConnectParams {
    let settings = runtime::settings();
    let props = resolve_dsn(dsn, paths);
    let mut params = ConnectParams {
        host: settings.default_host.clone(),
        user: user.to_string(),
        auth: auth.to_string(),
        database: String::new(),
        port: settings.default_port,
    };

    let server = props.get("server").or_else(|| props.get("host"));
    match server {
        Some(server) => {
            let (host, port) = split_host_port(server);
            params.host = host;
            if let Some(port) = port {
                params.port = port;
            }
        }
        None if props.is_empty() && !dsn.is_empty() => params.host = dsn.to_string(),
        None => {}
    }
    if let Some(port) = props.get("port").and_then(|p| p.parse().ok()) {
        params.port = port;
    }
    if let Some(db) = props.get("database") {
        params.database = db.clone();
    }
    if params.user.is_empty() {
        if let Some(uid) = props.get("uid") {
            params.user = uid.clone();
        }
    }
    if params.auth.is_empty() {
        if let Some(pwd) = props.get("pwd") {
            params.auth = pwd.clone();
        }
    }
    params
}

/// Opens the native connection. Fails when one is already open.
pub fn connect(conn: &Connection, params: ConnectParams) -> Result<SQLRETURN, DriverError> {
    let mut state = conn.state();
    if state.native.is_some() {
        return Err(DriverError::ConnectionInUse);
    }

    let native = runtime::engine()
        .connect(&params)
        .map_err(DriverError::ConnectFailed)?;
    tracing::info!(
        host = %params.host,
        port = params.port,
        user = %params.user,
        database = %params.database,
        "connected"
    );
    state.native = Some(native);
    state.target = Some(params);
    Ok(SQL_SUCCESS)
}

pub fn driver_connect(
    conn: &Connection,
    conn_str: &str,
    completion: SQLUSMALLINT,
    paths: &[PathBuf],
) -> Result<SQLRETURN, DriverError> {
    if completion != SQL_DRIVER_NOPROMPT {
        return Err(DriverError::DriverCompletion(completion));
    }
    if conn.is_connected() {
        return Err(DriverError::ConnectionInUse);
    }
    let parsed = parse_connection_string(conn_str)?;
    let mut params = target_params(&parsed.dsn, &parsed.uid, &parsed.pwd, paths);
    if let Some(server) = parsed.server {
        params.host = server;
    }
    if let Some(port) = parsed.port {
        params.port = port;
    }
    if let Some(db) = parsed.database {
        params.database = db;
    }
    connect(conn, params)
}

/// Always succeeds; disconnecting twice is harmless.
pub fn disconnect(conn: &Connection) -> SQLRETURN {
    let mut state = conn.state();
    if let Some(target) = state.target.take() {
        tracing::info!(host = %target.host, "disconnected");
    }
    state.native = None;
    SQL_SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_requires_dsn() {
        let err = parse_connection_string("UID=root;PWD=taosdata").unwrap_err();
        assert_eq!(err.sqlstate(), "08001");
        assert_eq!(
            err.to_string(),
            "unrecognized connection string: [UID=root;PWD=taosdata]"
        );
    }

    #[test]
    fn parse_keys_are_case_insensitive_and_trimmed() {
        let cs = parse_connection_string(" dsn = TAOS ; Uid=root;pWd= taosdata ;Server=db1:6030;DB=metrics;Extra=1;")
            .unwrap();
        assert_eq!(cs.dsn, "TAOS");
        assert_eq!(cs.uid, "root");
        assert_eq!(cs.pwd, "taosdata");
        assert_eq!(cs.server.as_deref(), Some("db1"));
        assert_eq!(cs.port, Some(6030));
        assert_eq!(cs.database.as_deref(), Some("metrics"));
    }

    #[test]
    fn parse_rejects_pairs_without_equals() {
        assert!(parse_connection_string("DSN=x;garbage").is_err());
    }

    #[test]
    fn host_port_forms() {
        assert_eq!(split_host_port("h"), ("h".to_string(), None));
        assert_eq!(split_host_port("h:1"), ("h".to_string(), Some(1)));
        assert_eq!(split_host_port("h, 2"), ("h".to_string(), Some(2)));
        assert_eq!(split_host_port("h:x"), ("h:x".to_string(), None));
    }

    #[test]
    fn resolve_dsn_reads_first_file_with_section() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.ini");
        let second = dir.path().join("second.ini");
        std::fs::write(&first, "[Other]\nServer=nope\n").unwrap();
        let mut f = std::fs::File::create(&second).unwrap();
        writeln!(f, "; comment\n[TAOS]\nDriver=/usr/lib/libtsodbc.so\nDescription=x\nServer = tsdb:6041\nDatabase=metrics").unwrap();

        let props = resolve_dsn("TAOS", &[first.clone(), second.clone()]);
        assert_eq!(props.get("server").map(String::as_str), Some("tsdb:6041"));
        assert_eq!(props.get("database").map(String::as_str), Some("metrics"));
        assert!(!props.contains_key("driver"));
        assert!(!props.contains_key("description"));

        let params = target_params("TAOS", "root", "", &[first, second]);
        assert_eq!(params.host, "tsdb");
        assert_eq!(params.port, 6041);
        assert_eq!(params.database, "metrics");
        assert_eq!(params.user, "root");
    }

    #[test]
    fn unknown_dsn_is_the_host() {
        let dir = tempfile::tempdir().unwrap();
        let params = target_params("db.example", "", "", &[dir.path().join("missing.ini")]);
        assert_eq!(params.host, "db.example");
        assert_eq!(params.database, "");
    }
}
