//! In-process engine with a tiny SQL subset.
//!
//! Understands `CREATE TABLE [IF NOT EXISTS]`, `DROP TABLE [IF EXISTS]`,
//! `INSERT INTO t [(cols)] VALUES (...)[, (...)]` with `?` placeholders and
//! `SELECT * | cols FROM t [LIMIT n]`. Cells are stored in wire format. All
//! connections of one engine share its catalog.

use super::{
    ConnectParams, Engine, EngineError, Field, NativeConnection, NativeStatement, ResultSet, Row,
    WireBind, WireType, VARSTR_HEADER_SIZE,
};
use crate::timestamp;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub mod codes {
    pub const AUTH_FAILURE: i32 = 0x0003;
    pub const SYNTAX_ERROR: i32 = 0x0216;
    pub const PARAM_MISMATCH: i32 = 0x0217;
    pub const VALUE_OUT_OF_RANGE: i32 = 0x0218;
    pub const NO_RESULT: i32 = 0x0219;
    pub const TABLE_ALREADY_EXIST: i32 = 0x0360;
    pub const TABLE_NOT_EXIST: i32 = 0x0362;
    pub const FIELD_NOT_EXIST: i32 = 0x036C;
}

pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "taosdata";

/// Live native objects, for checking that each is released exactly once.
#[derive(Debug, Default)]
pub struct Stats {
    connections: AtomicUsize,
    statements: AtomicUsize,
    result_sets: AtomicUsize,
}

impl Stats {
    pub fn live_connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn live_statements(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    pub fn live_result_sets(&self) -> usize {
        self.result_sets.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Connection,
    Statement,
    ResultSet,
}

/// Counts one live object for as long as it exists.
struct Live {
    stats: Arc<Stats>,
    kind: Kind,
}

impl Live {
    fn new(stats: &Arc<Stats>, kind: Kind) -> Self {
        stats.counter(kind).fetch_add(1, Ordering::SeqCst);
        Self {
            stats: Arc::clone(stats),
            kind,
        }
    }
}

impl Drop for Live {
    fn drop(&mut self) {
        self.stats.counter(self.kind).fetch_sub(1, Ordering::SeqCst);
    }
}

impl Stats {
    fn counter(&self, kind: Kind) -> &AtomicUsize {
        match kind {
            Kind::Connection => &self.connections,
            Kind::Statement => &self.statements,
            Kind::ResultSet => &self.result_sets,
        }
    }
}

#[derive(Default)]
pub struct LoopbackEngine {
    catalog: Arc<Mutex<Catalog>>,
    stats: Arc<Stats>,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }
}

impl Engine for LoopbackEngine {
    fn init(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn NativeConnection>, EngineError> {
        let user = if params.user.is_empty() {
            DEFAULT_USER
        } else {
            params.user.as_str()
        };
        let auth = if params.auth.is_empty() {
            DEFAULT_PASSWORD
        } else {
            params.auth.as_str()
        };
        if user != DEFAULT_USER || auth != DEFAULT_PASSWORD {
            return Err(EngineError::new(codes::AUTH_FAILURE, "authentication failure"));
        }
        Ok(Box::new(LoopbackConnection {
            catalog: Arc::clone(&self.catalog),
            stats: Arc::clone(&self.stats),
            _live: Live::new(&self.stats, Kind::Connection),
        }))
    }
}

struct LoopbackConnection {
    catalog: Arc<Mutex<Catalog>>,
    stats: Arc<Stats>,
    _live: Live,
}

impl NativeConnection for LoopbackConnection {
    fn query(&mut self, sql: &str) -> Result<Box<dyn ResultSet>, EngineError> {
        let stmt = parse(sql)?;
        if stmt.param_count > 0 {
            return Err(EngineError::new(
                codes::PARAM_MISMATCH,
                "placeholders need a prepared statement",
            ));
        }
        let result = self.catalog.lock().execute(&stmt.kind, &[])?;
        Ok(Box::new(result.into_result_set(&self.stats)))
    }

    fn stmt_init(&mut self) -> Result<Box<dyn NativeStatement>, EngineError> {
        Ok(Box::new(LoopbackStatement {
            catalog: Arc::clone(&self.catalog),
            stats: Arc::clone(&self.stats),
            parsed: None,
            current: None,
            batch: Vec::new(),
            outcome: None,
            _live: Live::new(&self.stats, Kind::Statement),
        }))
    }
}

struct LoopbackStatement {
    catalog: Arc<Mutex<Catalog>>,
    stats: Arc<Stats>,
    parsed: Option<Parsed>,
    current: Option<Vec<Scalar>>,
    batch: Vec<Vec<Scalar>>,
    outcome: Option<Outcome>,
    _live: Live,
}

impl LoopbackStatement {
    fn parsed(&self) -> Result<&Parsed, EngineError> {
        self.parsed
            .as_ref()
            .ok_or_else(|| EngineError::new(codes::SYNTAX_ERROR, "statement not prepared"))
    }
}

impl NativeStatement for LoopbackStatement {
    fn prepare(&mut self, sql: &str) -> Result<(), EngineError> {
        self.parsed = Some(parse(sql)?);
        self.current = None;
        self.batch.clear();
        self.outcome = None;
        Ok(())
    }

    fn bind_params(&mut self, binds: &[WireBind]) -> Result<(), EngineError> {
        let expected = self.parsed()?.param_count;
        if binds.len() != expected {
            return Err(EngineError::new(
                codes::PARAM_MISMATCH,
                format!("{} parameters bound, statement has {expected}", binds.len()),
            ));
        }
        self.current = Some(binds.iter().map(Scalar::from_bind).collect());
        Ok(())
    }

    fn add_batch(&mut self) -> Result<(), EngineError> {
        let row = self
            .current
            .take()
            .ok_or_else(|| EngineError::new(codes::PARAM_MISMATCH, "no parameters bound"))?;
        self.batch.push(row);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), EngineError> {
        let parsed = self.parsed()?;
        if parsed.param_count > 0 && self.batch.is_empty() {
            return Err(EngineError::new(codes::PARAM_MISMATCH, "parameters not bound"));
        }
        let outcome = self.catalog.lock().execute(&parsed.kind, &self.batch)?;
        self.batch.clear();
        self.outcome = Some(outcome);
        Ok(())
    }

    fn use_result(&mut self) -> Result<Box<dyn ResultSet>, EngineError> {
        let outcome = self
            .outcome
            .take()
            .ok_or_else(|| EngineError::new(codes::NO_RESULT, "statement not executed"))?;
        Ok(Box::new(outcome.into_result_set(&self.stats)))
    }
}

struct LoopbackResultSet {
    fields: Vec<Field>,
    rows: std::vec::IntoIter<Row>,
    affected: i64,
    _live: Live,
}

impl ResultSet for LoopbackResultSet {
    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn fetch_row(&mut self) -> Option<Row> {
        self.rows.next()
    }

    fn affected_rows(&self) -> i64 {
        self.affected
    }
}

// ── Catalog ─────────────────────────────────────────────────────────

struct Table {
    fields: Vec<Field>,
    rows: Vec<Row>,
}

#[derive(Default)]
struct Catalog {
    tables: HashMap<String, Table>,
}

struct Outcome {
    fields: Vec<Field>,
    rows: Vec<Row>,
    affected: i64,
}

impl Outcome {
    fn empty(affected: i64) -> Self {
        Self {
            fields: Vec::new(),
            rows: Vec::new(),
            affected,
        }
    }

    fn into_result_set(self, stats: &Arc<Stats>) -> LoopbackResultSet {
        LoopbackResultSet {
            fields: self.fields,
            rows: self.rows.into_iter(),
            affected: self.affected,
            _live: Live::new(stats, Kind::ResultSet),
        }
    }
}

fn no_table(name: &str) -> EngineError {
    EngineError::new(codes::TABLE_NOT_EXIST, format!("table does not exist: {name}"))
}

impl Catalog {
    fn execute(&mut self, kind: &StmtKind, batch: &[Vec<Scalar>]) -> Result<Outcome, EngineError> {
        match kind {
            StmtKind::Create {
                table,
                if_not_exists,
                fields,
            } => {
                if self.tables.contains_key(table) {
                    if *if_not_exists {
                        return Ok(Outcome::empty(0));
                    }
                    return Err(EngineError::new(
                        codes::TABLE_ALREADY_EXIST,
                        format!("table already exists: {table}"),
                    ));
                }
                self.tables.insert(
                    table.clone(),
                    Table {
                        fields: fields.clone(),
                        rows: Vec::new(),
                    },
                );
                Ok(Outcome::empty(0))
            }
            StmtKind::Drop { table, if_exists } => {
                if self.tables.remove(table).is_none() && !if_exists {
                    return Err(no_table(table));
                }
                Ok(Outcome::empty(0))
            }
            StmtKind::Insert {
                table,
                columns,
                tuples,
            } => {
                let t = self.tables.get_mut(table).ok_or_else(|| no_table(table))?;
                let targets = match columns {
                    Some(names) => names
                        .iter()
                        .map(|n| column_index(&t.fields, n))
                        .collect::<Result<Vec<_>, _>>()?,
                    None => (0..t.fields.len()).collect(),
                };
                let no_params = [Vec::new()];
                let batch = if batch.is_empty() { &no_params[..] } else { batch };
                let mut inserted = Vec::new();
                for params in batch {
                    for tuple in tuples {
                        if tuple.len() != targets.len() {
                            return Err(EngineError::new(
                                codes::SYNTAX_ERROR,
                                format!("{} values for {} columns", tuple.len(), targets.len()),
                            ));
                        }
                        let mut row: Row = vec![None; t.fields.len()];
                        for (expr, &col) in tuple.iter().zip(&targets) {
                            row[col] = encode(&t.fields[col], expr.eval(params)?)?;
                        }
                        inserted.push(row);
                    }
                }
                let affected = inserted.len() as i64;
                t.rows.extend(inserted);
                Ok(Outcome::empty(affected))
            }
            StmtKind::Select {
                table,
                columns,
                limit,
            } => {
                let t = self.tables.get(table).ok_or_else(|| no_table(table))?;
                let picks = match columns {
                    Some(names) => names
                        .iter()
                        .map(|n| column_index(&t.fields, n))
                        .collect::<Result<Vec<_>, _>>()?,
                    None => (0..t.fields.len()).collect(),
                };
                let fields = picks.iter().map(|&i| t.fields[i].clone()).collect();
                let rows = t
                    .rows
                    .iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .map(|r| picks.iter().map(|&i| r[i].clone()).collect())
                    .collect();
                Ok(Outcome {
                    fields,
                    rows,
                    affected: 0,
                })
            }
        }
    }
}

fn column_index(fields: &[Field], name: &str) -> Result<usize, EngineError> {
    fields
        .iter()
        .position(|f| f.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| EngineError::new(codes::FIELD_NOT_EXIST, format!("invalid column name: {name}")))
}

// ── Values ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Null,
    Int(i64),
    Real(f64),
    Text(Vec<u8>),
}

impl Scalar {
    fn from_bind(b: &WireBind) -> Scalar {
        if b.is_null {
            return Scalar::Null;
        }
        let buf = &b.buffer[..b.length.min(b.buffer.len())];
        fn le<const N: usize>(buf: &[u8]) -> Option<[u8; N]> {
            buf.get(..N)?.try_into().ok()
        }
        let value = match b.buffer_type {
            WireType::Bool => buf.first().map(|&v| Scalar::Int((v != 0) as i64)),
            WireType::TinyInt => le(buf).map(|v| Scalar::Int(i8::from_le_bytes(v) as i64)),
            WireType::SmallInt => le(buf).map(|v| Scalar::Int(i16::from_le_bytes(v) as i64)),
            WireType::Int => le(buf).map(|v| Scalar::Int(i32::from_le_bytes(v) as i64)),
            WireType::BigInt | WireType::Timestamp => le(buf).map(|v| Scalar::Int(i64::from_le_bytes(v))),
            WireType::Float => le(buf).map(|v| Scalar::Real(f32::from_le_bytes(v) as f64)),
            WireType::Double => le(buf).map(|v| Scalar::Real(f64::from_le_bytes(v))),
            WireType::Binary | WireType::NChar => Some(Scalar::Text(buf.to_vec())),
            WireType::Null => None,
        };
        value.unwrap_or(Scalar::Null)
    }
}

fn out_of_range(field: &Field) -> EngineError {
    EngineError::new(
        codes::VALUE_OUT_OF_RANGE,
        format!("value out of range for column {} ({})", field.name, field.wire_type.name()),
    )
}

fn text_number(field: &Field, text: &[u8]) -> Result<Scalar, EngineError> {
    let s = std::str::from_utf8(text).map_err(|_| out_of_range(field))?.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Scalar::Int(i));
    }
    s.parse::<f64>()
        .map(Scalar::Real)
        .map_err(|_| out_of_range(field))
}

/// Converts a value into the column's cell format.
fn encode(field: &Field, value: Scalar) -> Result<Option<Vec<u8>>, EngineError> {
    let value = match (field.wire_type, value) {
        (_, Scalar::Null) => return Ok(None),
        (WireType::Binary | WireType::NChar | WireType::Timestamp, v) => v,
        (_, Scalar::Text(t)) => text_number(field, &t)?,
        (_, v) => v,
    };
    let int = |lo: i64, hi: i64| match value {
        Scalar::Int(i) if (lo..=hi).contains(&i) => Ok(i),
        Scalar::Real(f) if f.is_finite() && f.trunc() >= lo as f64 && f.trunc() < hi as f64 + 1.0 => {
            Ok(f.trunc() as i64)
        }
        _ => Err(out_of_range(field)),
    };
    let cell = match field.wire_type {
        WireType::Bool => vec![(int(i64::MIN, i64::MAX)? != 0) as u8],
        WireType::TinyInt => (int(i8::MIN as i64, i8::MAX as i64)? as i8).to_le_bytes().to_vec(),
        WireType::SmallInt => (int(i16::MIN as i64, i16::MAX as i64)? as i16).to_le_bytes().to_vec(),
        WireType::Int => (int(i32::MIN as i64, i32::MAX as i64)? as i32).to_le_bytes().to_vec(),
        WireType::BigInt => int(i64::MIN, i64::MAX)?.to_le_bytes().to_vec(),
        WireType::Float => match value {
            Scalar::Int(i) => (i as f32).to_le_bytes().to_vec(),
            Scalar::Real(f) => (f as f32).to_le_bytes().to_vec(),
            _ => return Err(out_of_range(field)),
        },
        WireType::Double => match value {
            Scalar::Int(i) => (i as f64).to_le_bytes().to_vec(),
            Scalar::Real(f) => f.to_le_bytes().to_vec(),
            _ => return Err(out_of_range(field)),
        },
        WireType::Timestamp => match value {
            Scalar::Int(ms) => ms.to_le_bytes().to_vec(),
            Scalar::Text(t) => std::str::from_utf8(&t)
                .ok()
                .and_then(timestamp::parse)
                .ok_or_else(|| out_of_range(field))?
                .to_le_bytes()
                .to_vec(),
            _ => return Err(out_of_range(field)),
        },
        WireType::Binary | WireType::NChar => {
            let bytes = match value {
                Scalar::Text(t) => t,
                Scalar::Int(i) => i.to_string().into_bytes(),
                Scalar::Real(f) => f.to_string().into_bytes(),
                Scalar::Null => return Ok(None),
            };
            if bytes.len() > field.payload_width() {
                return Err(EngineError::new(
                    codes::VALUE_OUT_OF_RANGE,
                    format!("string data too long for column {}", field.name),
                ));
            }
            bytes
        }
        WireType::Null => return Ok(None),
    };
    Ok(Some(cell))
}

// ── SQL subset ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(String),
    Str(String),
    Punct(char),
}

fn syntax(msg: impl Into<String>) -> EngineError {
    EngineError::new(codes::SYNTAX_ERROR, msg)
}

fn tokenize(sql: &str) -> Result<Vec<Token>, EngineError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() {
                let d = chars[i];
                let exp_sign = (d == '+' || d == '-') && matches!(chars[i - 1], 'e' | 'E');
                if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exp_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
        } else if c == '\'' || c == '"' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(syntax("unterminated string")),
                    Some(&q) if q == quote => {
                        if chars.get(i + 1) == Some(&quote) {
                            text.push(quote);
                            i += 2;
                        } else {
                            i += 1;
                            break;
                        }
                    }
                    Some(&ch) => {
                        text.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(text));
        } else if "(),*;?-+".contains(c) {
            tokens.push(Token::Punct(c));
            i += 1;
        } else {
            return Err(syntax(format!("unexpected character '{c}'")));
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Null,
    Literal(Scalar),
    Param(usize),
    Now,
}

impl Expr {
    fn eval(&self, params: &[Scalar]) -> Result<Scalar, EngineError> {
        Ok(match self {
            Expr::Null => Scalar::Null,
            Expr::Literal(v) => v.clone(),
            Expr::Param(i) => params
                .get(*i)
                .cloned()
                .ok_or_else(|| EngineError::new(codes::PARAM_MISMATCH, format!("parameter {} not bound", i + 1)))?,
            Expr::Now => Scalar::Int(chrono::Utc::now().timestamp_millis()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StmtKind {
    Create {
        table: String,
        if_not_exists: bool,
        fields: Vec<Field>,
    },
    Drop {
        table: String,
        if_exists: bool,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        tuples: Vec<Vec<Expr>>,
    },
    Select {
        table: String,
        columns: Option<Vec<String>>,
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Parsed {
    kind: StmtKind,
    param_count: usize,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    params: usize,
}

fn parse(sql: &str) -> Result<Parsed, EngineError> {
    let mut p = Parser {
        tokens: tokenize(sql)?,
        pos: 0,
        params: 0,
    };
    let kind = p.statement()?;
    p.eat_punct(';');
    if let Some(t) = p.peek() {
        return Err(syntax(format!("unexpected trailing input near {t:?}")));
    }
    Ok(Parsed {
        kind,
        param_count: p.params,
    })
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        let hit = self.is_keyword(kw);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn keyword(&mut self, kw: &str) -> Result<(), EngineError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(syntax(format!("expected {}", kw.to_uppercase())))
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        let hit = self.peek() == Some(&Token::Punct(c));
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn punct(&mut self, c: char) -> Result<(), EngineError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(syntax(format!("expected '{c}'")))
        }
    }

    fn ident(&mut self) -> Result<String, EngineError> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w.to_lowercase()),
            other => Err(syntax(format!("expected identifier, found {other:?}"))),
        }
    }

    fn unsigned(&mut self) -> Result<usize, EngineError> {
        match self.next() {
            Some(Token::Number(n)) => n.parse().map_err(|_| syntax(format!("bad size {n}"))),
            other => Err(syntax(format!("expected number, found {other:?}"))),
        }
    }

    fn statement(&mut self) -> Result<StmtKind, EngineError> {
        if self.eat_keyword("create") {
            self.create()
        } else if self.eat_keyword("drop") {
            self.keyword("table")?;
            let if_exists = self.eat_keyword("if");
            if if_exists {
                self.keyword("exists")?;
            }
            Ok(StmtKind::Drop {
                table: self.ident()?,
                if_exists,
            })
        } else if self.eat_keyword("insert") {
            self.insert()
        } else if self.eat_keyword("select") {
            self.select()
        } else {
            Err(syntax("unsupported statement"))
        }
    }

    fn create(&mut self) -> Result<StmtKind, EngineError> {
        self.keyword("table")?;
        let if_not_exists = self.eat_keyword("if");
        if if_not_exists {
            self.keyword("not")?;
            self.keyword("exists")?;
        }
        let table = self.ident()?;
        self.punct('(')?;
        let mut fields = Vec::new();
        loop {
            let name = self.ident()?;
            let type_name = self.ident()?;
            let (wire_type, bytes) = match type_name.as_str() {
                "bool" => (WireType::Bool, 1),
                "tinyint" => (WireType::TinyInt, 1),
                "smallint" => (WireType::SmallInt, 2),
                "int" | "integer" => (WireType::Int, 4),
                "bigint" => (WireType::BigInt, 8),
                "float" => (WireType::Float, 4),
                "double" => (WireType::Double, 8),
                "timestamp" => (WireType::Timestamp, 8),
                "binary" | "nchar" => {
                    self.punct('(')?;
                    let n = self.unsigned()?;
                    self.punct(')')?;
                    let t = if type_name == "binary" {
                        WireType::Binary
                    } else {
                        WireType::NChar
                    };
                    (t, n + VARSTR_HEADER_SIZE)
                }
                other => return Err(syntax(format!("unknown column type {other}"))),
            };
            fields.push(Field::new(name, wire_type, bytes));
            if !self.eat_punct(',') {
                break;
            }
        }
        self.punct(')')?;
        Ok(StmtKind::Create {
            table,
            if_not_exists,
            fields,
        })
    }

    fn column_list(&mut self) -> Result<Vec<String>, EngineError> {
        let mut cols = vec![self.ident()?];
        while self.eat_punct(',') {
            cols.push(self.ident()?);
        }
        Ok(cols)
    }

    fn insert(&mut self) -> Result<StmtKind, EngineError> {
        self.keyword("into")?;
        let table = self.ident()?;
        let columns = if self.eat_punct('(') {
            let cols = self.column_list()?;
            self.punct(')')?;
            Some(cols)
        } else {
            None
        };
        self.keyword("values")?;
        let mut tuples = Vec::new();
        loop {
            self.punct('(')?;
            let mut tuple = vec![self.expr()?];
            while self.eat_punct(',') {
                tuple.push(self.expr()?);
            }
            self.punct(')')?;
            tuples.push(tuple);
            // both `VALUES (..) (..)` and `VALUES (..), (..)`
            self.eat_punct(',');
            if self.peek() != Some(&Token::Punct('(')) {
                break;
            }
        }
        Ok(StmtKind::Insert {
            table,
            columns,
            tuples,
        })
    }

    fn expr(&mut self) -> Result<Expr, EngineError> {
        let negative = if self.eat_punct('-') {
            true
        } else {
            self.eat_punct('+');
            false
        };
        let expr = match self.next() {
            Some(Token::Number(n)) => {
                let n = if negative { format!("-{n}") } else { n };
                if let Ok(i) = n.parse::<i64>() {
                    Expr::Literal(Scalar::Int(i))
                } else {
                    n.parse::<f64>()
                        .map(|f| Expr::Literal(Scalar::Real(f)))
                        .map_err(|_| syntax(format!("bad number {n}")))?
                }
            }
            Some(_) if negative => return Err(syntax("expected number after '-'")),
            Some(Token::Str(s)) => Expr::Literal(Scalar::Text(s.into_bytes())),
            Some(Token::Punct('?')) => {
                self.params += 1;
                Expr::Param(self.params - 1)
            }
            Some(Token::Word(w)) => match w.to_lowercase().as_str() {
                "null" => Expr::Null,
                "true" => Expr::Literal(Scalar::Int(1)),
                "false" => Expr::Literal(Scalar::Int(0)),
                "now" => {
                    if self.eat_punct('(') {
                        self.punct(')')?;
                    }
                    Expr::Now
                }
                other => return Err(syntax(format!("unexpected word {other}"))),
            },
            other => return Err(syntax(format!("unexpected token {other:?}"))),
        };
        Ok(expr)
    }

    fn select(&mut self) -> Result<StmtKind, EngineError> {
        let columns = if self.eat_punct('*') {
            None
        } else {
            Some(self.column_list()?)
        };
        self.keyword("from")?;
        let table = self.ident()?;
        let limit = if self.eat_keyword("limit") {
            Some(self.unsigned()?)
        } else {
            None
        };
        Ok(StmtKind::Select {
            table,
            columns,
            limit,
        })
    }
}
