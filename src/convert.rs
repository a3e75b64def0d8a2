//! Fetch-side conversion matrix: engine cells into caller buffers.
//!
//! [`lookup`] maps a `(wire type, C type)` pair to one pure function of the
//! shape [`ConvFn`]. Pairs with no entry are rejected before any buffer is
//! touched. Each function writes through a [`Target`] and reports an
//! [`Outcome`]; mapping outcomes onto SQLSTATEs is left to [`convert`].

use crate::engine::WireType;
use crate::error::DriverError;
use crate::timestamp;
use crate::types::*;
use std::borrow::Cow;

/// Caller-side buffer representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CType {
    Bit,
    TinyInt,
    Short,
    Long,
    SBigInt,
    Float,
    Double,
    Char,
    Binary,
    Timestamp,
    Date,
    Time,
    Numeric,
}

impl CType {
    pub fn from_code(code: SQLSMALLINT) -> Option<CType> {
        Some(match code {
            SQL_C_BIT => CType::Bit,
            SQL_C_TINYINT | SQL_C_STINYINT => CType::TinyInt,
            SQL_C_SHORT | SQL_C_SSHORT => CType::Short,
            SQL_C_LONG | SQL_C_SLONG => CType::Long,
            SQL_C_SBIGINT => CType::SBigInt,
            SQL_C_FLOAT => CType::Float,
            SQL_C_DOUBLE => CType::Double,
            SQL_C_CHAR => CType::Char,
            SQL_C_BINARY => CType::Binary,
            SQL_C_TIMESTAMP | SQL_C_TYPE_TIMESTAMP => CType::Timestamp,
            SQL_C_DATE | SQL_C_TYPE_DATE => CType::Date,
            SQL_C_TIME | SQL_C_TYPE_TIME => CType::Time,
            SQL_C_NUMERIC => CType::Numeric,
            _ => return None,
        })
    }

    pub fn code(self) -> SQLSMALLINT {
        match self {
            CType::Bit => SQL_C_BIT,
            CType::TinyInt => SQL_C_TINYINT,
            CType::Short => SQL_C_SHORT,
            CType::Long => SQL_C_LONG,
            CType::SBigInt => SQL_C_SBIGINT,
            CType::Float => SQL_C_FLOAT,
            CType::Double => SQL_C_DOUBLE,
            CType::Char => SQL_C_CHAR,
            CType::Binary => SQL_C_BINARY,
            CType::Timestamp => SQL_C_TYPE_TIMESTAMP,
            CType::Date => SQL_C_TYPE_DATE,
            CType::Time => SQL_C_TYPE_TIME,
            CType::Numeric => SQL_C_NUMERIC,
        }
    }

    /// Natural target of a wire type, used for `SQL_C_DEFAULT`.
    pub fn default_for(wire: WireType) -> CType {
        match wire {
            WireType::Bool => CType::Bit,
            WireType::TinyInt => CType::TinyInt,
            WireType::SmallInt => CType::Short,
            WireType::Int => CType::Long,
            WireType::BigInt => CType::SBigInt,
            WireType::Float => CType::Float,
            WireType::Double => CType::Double,
            WireType::Binary => CType::Binary,
            WireType::Timestamp => CType::Timestamp,
            WireType::NChar | WireType::Null => CType::Char,
        }
    }

    /// Size of a fixed-width C value; `None` for character and binary buffers.
    pub fn width(self) -> Option<usize> {
        use std::mem::size_of;
        match self {
            CType::Bit | CType::TinyInt => Some(1),
            CType::Short => Some(2),
            CType::Long | CType::Float => Some(4),
            CType::SBigInt | CType::Double => Some(8),
            CType::Timestamp => Some(size_of::<SqlTimestampStruct>()),
            CType::Date => Some(size_of::<SqlDateStruct>()),
            CType::Time => Some(size_of::<SqlTimeStruct>()),
            CType::Numeric => Some(size_of::<SqlNumericStruct>()),
            CType::Char | CType::Binary => None,
        }
    }
}

/// A decoded, non-null cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Timestamp(i64),
    Binary(&'a [u8]),
    NChar(&'a [u8]),
}

impl<'a> Value<'a> {
    /// Decodes a little-endian cell. `None` when the cell is shorter than its
    /// type or the type carries no value.
    pub fn decode(wire: WireType, cell: &'a [u8]) -> Option<Value<'a>> {
        fn le<const N: usize>(cell: &[u8]) -> Option<[u8; N]> {
            cell.get(..N)?.try_into().ok()
        }
        Some(match wire {
            WireType::Bool => Value::Bool(*cell.first()? != 0),
            WireType::TinyInt => Value::TinyInt(i8::from_le_bytes(le(cell)?)),
            WireType::SmallInt => Value::SmallInt(i16::from_le_bytes(le(cell)?)),
            WireType::Int => Value::Int(i32::from_le_bytes(le(cell)?)),
            WireType::BigInt => Value::BigInt(i64::from_le_bytes(le(cell)?)),
            WireType::Float => Value::Float(f32::from_le_bytes(le(cell)?)),
            WireType::Double => Value::Double(f64::from_le_bytes(le(cell)?)),
            WireType::Timestamp => Value::Timestamp(i64::from_le_bytes(le(cell)?)),
            WireType::Binary => Value::Binary(cell),
            WireType::NChar => Value::NChar(cell),
            WireType::Null => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    StringTruncated,
    FractionalTruncated,
    OutOfRange,
    Malformed,
    DatetimeOverflow,
}

/// Caller buffer view. An empty `buf` stands for a null target pointer.
pub struct Target<'a> {
    pub buf: &'a mut [u8],
    pub indicator: Option<&'a mut SQLLEN>,
}

impl<'a> Target<'a> {
    pub fn new(buf: &'a mut [u8], indicator: Option<&'a mut SQLLEN>) -> Self {
        Self { buf, indicator }
    }

    fn set_indicator(&mut self, len: usize) {
        if let Some(ind) = self.indicator.as_deref_mut() {
            *ind = len as SQLLEN;
        }
    }

    fn put_fixed(&mut self, bytes: &[u8]) -> Outcome {
        if self.buf.len() >= bytes.len() {
            self.buf[..bytes.len()].copy_from_slice(bytes);
        }
        self.set_indicator(bytes.len());
        Outcome::Ok
    }

    fn put_struct<T: Copy>(&mut self, value: T) -> Outcome {
        let bytes = unsafe {
            std::slice::from_raw_parts(&value as *const T as *const u8, std::mem::size_of::<T>())
        };
        self.put_fixed(bytes)
    }

    /// Copies as much as fits; `terminate` reserves one byte for a NUL.
    /// The indicator always carries the full length.
    fn put_text(&mut self, bytes: &[u8], terminate: bool) -> Outcome {
        self.set_indicator(bytes.len());
        let room = if terminate {
            self.buf.len().saturating_sub(1)
        } else {
            self.buf.len()
        };
        let n = bytes.len().min(room);
        self.buf[..n].copy_from_slice(&bytes[..n]);
        if terminate && !self.buf.is_empty() {
            self.buf[n] = 0;
        }
        if n < bytes.len() {
            Outcome::StringTruncated
        } else {
            Outcome::Ok
        }
    }
}

pub type ConvFn = fn(&Value<'_>, &mut Target<'_>) -> Outcome;

/// The supported `(wire type, C type)` pairs.
pub fn lookup(wire: WireType, target: CType) -> Option<ConvFn> {
    use WireType as W;
    let numeric = matches!(
        wire,
        W::Bool | W::TinyInt | W::SmallInt | W::Int | W::BigInt | W::Float | W::Double | W::NChar
    );
    let f: ConvFn = match (wire, target) {
        (_, CType::Bit) if numeric => to_bit,
        (_, CType::TinyInt) if numeric => to_tinyint,
        (_, CType::Short) if numeric => to_short,
        (_, CType::Long) if numeric => to_long,
        (_, CType::SBigInt) if numeric => to_sbigint,
        (_, CType::Float) if numeric => to_float,
        (_, CType::Double) if numeric => to_double,
        (_, CType::Char) if numeric => to_char,
        (_, CType::Binary) if numeric => to_binary,
        (W::Timestamp, CType::SBigInt) => to_sbigint,
        (W::Timestamp | W::Binary, CType::Char) => to_char,
        (W::Timestamp | W::Binary, CType::Binary) => to_binary,
        (W::Timestamp, CType::Timestamp) => to_timestamp,
        _ => return None,
    };
    Some(f)
}

/// Converts one non-null cell into the caller's buffer.
///
/// `Ok` carries the info-level condition, if any, that the caller should
/// surface as `SQL_SUCCESS_WITH_INFO`.
pub fn convert(
    wire: WireType,
    cell: &[u8],
    c_code: SQLSMALLINT,
    target: &mut Target<'_>,
) -> Result<Option<DriverError>, DriverError> {
    let unsupported = || DriverError::ConversionNotSupported {
        from: wire,
        to: c_code,
    };
    let c_type = CType::from_code(c_code).ok_or_else(unsupported)?;
    let f = lookup(wire, c_type).ok_or_else(unsupported)?;
    let value = Value::decode(wire, cell)
        .ok_or_else(|| DriverError::not_supported(format!("unknown TSDB_DATA_TYPE {wire}")))?;
    let detail = || format!("{wire} to SQL_C_TYPE [{c_code}]");
    match f(&value, target) {
        Outcome::Ok => Ok(None),
        Outcome::StringTruncated => Ok(Some(DriverError::StringTruncated)),
        Outcome::FractionalTruncated => Ok(Some(DriverError::FractionalTruncated)),
        Outcome::OutOfRange => Err(DriverError::OutOfRange(detail())),
        Outcome::Malformed => Err(DriverError::InvalidCharValue(detail())),
        Outcome::DatetimeOverflow => Err(DriverError::DatetimeOverflow(detail())),
    }
}

// ── Numeric targets ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Real(f64),
}

fn numeric(v: &Value<'_>) -> Result<Num, Outcome> {
    Ok(match *v {
        Value::Bool(b) => Num::Int(b as i64),
        Value::TinyInt(i) => Num::Int(i as i64),
        Value::SmallInt(i) => Num::Int(i as i64),
        Value::Int(i) => Num::Int(i as i64),
        Value::BigInt(i) | Value::Timestamp(i) => Num::Int(i),
        Value::Float(f) => Num::Real(f as f64),
        Value::Double(f) => Num::Real(f),
        Value::NChar(text) => return parse_number(text),
        Value::Binary(_) => return Err(Outcome::Malformed),
    })
}

/// Leading whitespace is skipped; the rest must be a complete literal.
/// Integer literals are kept exact so wide values survive the round trip.
fn parse_number(text: &[u8]) -> Result<Num, Outcome> {
    let s = std::str::from_utf8(text)
        .map_err(|_| Outcome::Malformed)?
        .trim_start();
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Num::Int(i));
    }
    s.parse::<f64>().map(Num::Real).map_err(|_| Outcome::Malformed)
}

/// Text only converts cleanly when the narrowed value renders back to the
/// very same text. `"+5"`, `" 42"` and `"1e2"` land in range but are lossy.
fn renders_back(v: &Value<'_>, narrowed: i64) -> bool {
    match v {
        Value::NChar(text) => narrowed.to_string().as_bytes() == *text,
        _ => true,
    }
}

/// Narrows to `[lo, hi]`: out of range is an error, a dropped fraction is
/// reported but the integral part is still written.
fn integral(v: &Value<'_>, lo: i64, hi: i64) -> Result<(i64, Outcome), Outcome> {
    let (i, outcome) = narrow(v, lo, hi)?;
    if outcome == Outcome::Ok && !renders_back(v, i) {
        return Ok((i, Outcome::FractionalTruncated));
    }
    Ok((i, outcome))
}

fn narrow(v: &Value<'_>, lo: i64, hi: i64) -> Result<(i64, Outcome), Outcome> {
    match numeric(v)? {
        Num::Int(i) if (lo..=hi).contains(&i) => Ok((i, Outcome::Ok)),
        Num::Int(_) => Err(Outcome::OutOfRange),
        Num::Real(f) => {
            let t = f.trunc();
            // NaN fails both comparisons
            if !(t >= lo as f64 && t < hi as f64 + 1.0) {
                return Err(Outcome::OutOfRange);
            }
            let outcome = if t == f {
                Outcome::Ok
            } else {
                Outcome::FractionalTruncated
            };
            Ok((t as i64, outcome))
        }
    }
}

fn to_bit(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    let (bit, outcome) = match numeric(v) {
        Ok(Num::Int(i @ (0 | 1))) => (i as u8, Outcome::Ok),
        Ok(Num::Int(_)) => return Outcome::OutOfRange,
        Ok(Num::Real(f)) if f == 0.0 || f == 1.0 => (f as u8, Outcome::Ok),
        Ok(Num::Real(f)) if f > 0.0 && f < 2.0 => (f as u8, Outcome::FractionalTruncated),
        Ok(Num::Real(_)) => return Outcome::OutOfRange,
        Err(o) => return o,
    };
    t.put_fixed(&[bit]);
    if outcome == Outcome::Ok && !renders_back(v, bit as i64) {
        return Outcome::FractionalTruncated;
    }
    outcome
}

fn to_tinyint(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    match integral(v, i8::MIN as i64, i8::MAX as i64) {
        Ok((i, outcome)) => {
            t.put_fixed(&(i as i8).to_ne_bytes());
            outcome
        }
        Err(o) => o,
    }
}

fn to_short(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    match integral(v, i16::MIN as i64, i16::MAX as i64) {
        Ok((i, outcome)) => {
            t.put_fixed(&(i as i16).to_ne_bytes());
            outcome
        }
        Err(o) => o,
    }
}

fn to_long(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    match integral(v, i32::MIN as i64, i32::MAX as i64) {
        Ok((i, outcome)) => {
            t.put_fixed(&(i as i32).to_ne_bytes());
            outcome
        }
        Err(o) => o,
    }
}

fn to_sbigint(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    match integral(v, i64::MIN, i64::MAX) {
        Ok((i, outcome)) => {
            t.put_fixed(&i.to_ne_bytes());
            outcome
        }
        Err(o) => o,
    }
}

fn to_float(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    let f = match (v, numeric(v)) {
        (Value::Float(f), _) => *f,
        (_, Ok(Num::Int(i))) => i as f32,
        (_, Ok(Num::Real(f))) if f.is_finite() && f.abs() > f32::MAX as f64 => {
            return Outcome::OutOfRange
        }
        (_, Ok(Num::Real(f))) => f as f32,
        (_, Err(o)) => return o,
    };
    t.put_fixed(&f.to_ne_bytes())
}

fn to_double(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    let f = match numeric(v) {
        Ok(Num::Int(i)) => i as f64,
        Ok(Num::Real(f)) => f,
        Err(o) => return o,
    };
    t.put_fixed(&f.to_ne_bytes())
}

// ── Text, binary and timestamp targets ──────────────────────────────

fn render<'v>(v: &Value<'v>) -> Result<Cow<'v, [u8]>, Outcome> {
    let text = match *v {
        Value::Bool(b) => (b as u8).to_string(),
        Value::TinyInt(i) => i.to_string(),
        Value::SmallInt(i) => i.to_string(),
        Value::Int(i) => i.to_string(),
        Value::BigInt(i) => i.to_string(),
        Value::Float(f) => format_g(f as f64),
        Value::Double(f) => format_fixed6(f),
        Value::Timestamp(ms) => timestamp::format_millis(ms).ok_or(Outcome::DatetimeOverflow)?,
        Value::Binary(b) | Value::NChar(b) => return Ok(Cow::Borrowed(b)),
    };
    Ok(Cow::Owned(text.into_bytes()))
}

fn to_char(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    match render(v) {
        Ok(text) => t.put_text(&text, true),
        Err(o) => o,
    }
}

fn to_binary(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    match render(v) {
        Ok(text) => t.put_text(&text, false),
        Err(o) => o,
    }
}

fn to_timestamp(v: &Value<'_>, t: &mut Target<'_>) -> Outcome {
    let Value::Timestamp(ms) = *v else {
        return Outcome::Malformed;
    };
    match timestamp::to_struct(ms) {
        Some(ts) => t.put_struct(ts),
        None => Outcome::DatetimeOverflow,
    }
}

/// C `%g`: six significant digits, trailing zeros dropped.
pub fn format_g(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let sci = format!("{:.5e}", v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let fixed = format!("{:.*}", (5 - exp) as usize, v);
        trim_fraction(&fixed).to_string()
    }
}

/// C `%.6f`.
pub fn format_fixed6(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.6}", v)
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(wire: WireType, cell: &[u8], c: SQLSMALLINT, buf: &mut [u8]) -> (Result<Option<DriverError>, DriverError>, SQLLEN) {
        let mut ind: SQLLEN = -99;
        let r = convert(wire, cell, c, &mut Target::new(buf, Some(&mut ind)));
        (r, ind)
    }

    fn text(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn text_to_tinyint_trichotomy() {
        let mut buf = [0u8; 1];
        let (r, ind) = run(WireType::NChar, &text("127"), SQL_C_TINYINT, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!((buf[0] as i8, ind), (127, 1));

        let (r, _) = run(WireType::NChar, &text("127.5"), SQL_C_TINYINT, &mut buf);
        assert!(matches!(r, Ok(Some(DriverError::FractionalTruncated))));
        assert_eq!(buf[0] as i8, 127);

        let (r, _) = run(WireType::NChar, &text("999"), SQL_C_TINYINT, &mut buf);
        let err = r.unwrap_err();
        assert_eq!(err.sqlstate(), "22003");
    }

    #[test]
    fn text_to_bit_trichotomy() {
        let mut buf = [9u8; 1];
        assert!(matches!(run(WireType::NChar, &text("1"), SQL_C_BIT, &mut buf).0, Ok(None)));
        assert_eq!(buf[0], 1);
        assert!(matches!(
            run(WireType::NChar, &text("1.5"), SQL_C_BIT, &mut buf).0,
            Ok(Some(DriverError::FractionalTruncated))
        ));
        assert_eq!(buf[0], 1);
        assert!(matches!(
            run(WireType::NChar, &text("0.25"), SQL_C_BIT, &mut buf).0,
            Ok(Some(DriverError::FractionalTruncated))
        ));
        assert_eq!(buf[0], 0);
        assert!(run(WireType::NChar, &text("2"), SQL_C_BIT, &mut buf).0.is_err());
        assert!(run(WireType::NChar, &text("-0.5"), SQL_C_BIT, &mut buf).0.is_err());
    }

    #[test]
    fn malformed_text_is_invalid_character_value() {
        let mut buf = [0u8; 4];
        let (r, _) = run(WireType::NChar, &text("12abc"), SQL_C_LONG, &mut buf);
        assert_eq!(r.unwrap_err().sqlstate(), "22018");
        let (r, _) = run(WireType::NChar, &text("  42"), SQL_C_LONG, &mut buf);
        assert!(matches!(r, Ok(Some(DriverError::FractionalTruncated))));
        assert_eq!(i32::from_ne_bytes(buf), 42);
    }

    #[test]
    fn text_must_render_back_exactly() {
        let mut buf = [0u8; 1];
        for (s, want) in [("127.0", 127), ("+5", 5), ("  42", 42), ("0127", 127), ("1e2", 100)] {
            let (r, _) = run(WireType::NChar, &text(s), SQL_C_TINYINT, &mut buf);
            assert!(matches!(r, Ok(Some(DriverError::FractionalTruncated))), "{s}");
            assert_eq!(buf[0] as i8, want, "{s}");
        }
        let (r, _) = run(WireType::NChar, &text("-128"), SQL_C_TINYINT, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!(buf[0] as i8, -128);

        let (r, _) = run(WireType::NChar, &text("1.0"), SQL_C_BIT, &mut buf);
        assert!(matches!(r, Ok(Some(DriverError::FractionalTruncated))));
        assert_eq!(buf[0], 1);
        let (r, _) = run(WireType::NChar, &text("0"), SQL_C_BIT, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!(buf[0], 0);

        let mut wide = [0u8; 8];
        let (r, _) = run(WireType::NChar, &text("-0"), SQL_C_SBIGINT, &mut wide);
        assert!(matches!(r, Ok(Some(DriverError::FractionalTruncated))));
        assert_eq!(i64::from_ne_bytes(wide), 0);
    }

    #[test]
    fn wide_integer_text_stays_exact() {
        let mut buf = [0u8; 8];
        let (r, _) = run(WireType::NChar, &text("9007199254740993"), SQL_C_SBIGINT, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!(i64::from_ne_bytes(buf), 9007199254740993);
    }

    #[test]
    fn integer_narrowing_is_range_checked() {
        let mut buf = [0u8; 2];
        let (r, _) = run(WireType::Int, &70000i32.to_le_bytes(), SQL_C_SHORT, &mut buf);
        assert_eq!(r.unwrap_err().sqlstate(), "22003");
        let (r, ind) = run(WireType::Int, &(-300i32).to_le_bytes(), SQL_C_SHORT, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!((i16::from_ne_bytes(buf), ind), (-300, 2));
    }

    #[test]
    fn double_into_integer_reports_fraction() {
        let mut buf = [0u8; 4];
        let (r, _) = run(WireType::Double, &2.75f64.to_le_bytes(), SQL_C_LONG, &mut buf);
        assert!(matches!(r, Ok(Some(DriverError::FractionalTruncated))));
        assert_eq!(i32::from_ne_bytes(buf), 2);
        let (r, _) = run(WireType::Double, &1e12f64.to_le_bytes(), SQL_C_LONG, &mut buf);
        assert!(r.is_err());
    }

    #[test]
    fn double_overflowing_float_is_out_of_range() {
        let mut buf = [0u8; 4];
        let (r, _) = run(WireType::Double, &1e300f64.to_le_bytes(), SQL_C_FLOAT, &mut buf);
        assert_eq!(r.unwrap_err().sqlstate(), "22003");
    }

    #[test]
    fn float_renders_like_percent_g() {
        assert_eq!(format_g(3.5), "3.5");
        assert_eq!(format_g(100000.0), "100000");
        assert_eq!(format_g(1234567.0), "1.23457e+06");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(0.00001234), "1.234e-05");
        assert_eq!(format_g(-2.0), "-2");
        assert_eq!(format_g(0.1f32 as f64), "0.1");
    }

    #[test]
    fn double_renders_six_decimals() {
        let mut buf = [0u8; 32];
        let (r, ind) = run(WireType::Double, &2.5f64.to_le_bytes(), SQL_C_CHAR, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!(ind, 8);
        assert_eq!(&buf[..9], b"2.500000\0");
    }

    #[test]
    fn char_truncation_keeps_full_length() {
        let mut buf = [0xffu8; 4];
        let (r, ind) = run(WireType::NChar, &text("abcdef"), SQL_C_CHAR, &mut buf);
        assert!(matches!(r, Ok(Some(DriverError::StringTruncated))));
        assert_eq!(ind, 6);
        assert_eq!(&buf, b"abc\0");
    }

    #[test]
    fn binary_target_is_unterminated() {
        let mut buf = [0xffu8; 4];
        let (r, ind) = run(WireType::Binary, b"wxyz", SQL_C_BINARY, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!((ind, &buf), (4, b"wxyz"));
        let (r, ind) = run(WireType::Binary, b"wxyz!", SQL_C_BINARY, &mut buf);
        assert!(matches!(r, Ok(Some(DriverError::StringTruncated))));
        assert_eq!(ind, 5);
    }

    #[test]
    fn exact_fit_char_is_truncated_by_terminator() {
        let mut buf = [0u8; 3];
        let (r, _) = run(WireType::NChar, &text("abc"), SQL_C_CHAR, &mut buf);
        assert!(matches!(r, Ok(Some(DriverError::StringTruncated))));
        assert_eq!(&buf, b"ab\0");
    }

    #[test]
    fn timestamp_targets() {
        let ms = timestamp::parse("2022-06-30 12:34:56.789").unwrap();
        let cell = ms.to_le_bytes();

        let mut raw = [0u8; 8];
        assert!(matches!(run(WireType::Timestamp, &cell, SQL_C_SBIGINT, &mut raw).0, Ok(None)));
        assert_eq!(i64::from_ne_bytes(raw), ms);

        let mut buf = [0u8; 32];
        let (r, ind) = run(WireType::Timestamp, &cell, SQL_C_CHAR, &mut buf);
        assert!(matches!(r, Ok(None)));
        assert_eq!(ind, 23);
        assert_eq!(&buf[..24], b"2022-06-30 12:34:56.789\0");

        let mut ts = [0u8; std::mem::size_of::<SqlTimestampStruct>()];
        let (r, _) = run(WireType::Timestamp, &cell, SQL_C_TYPE_TIMESTAMP, &mut ts);
        assert!(matches!(r, Ok(None)));
        let ts: SqlTimestampStruct = unsafe { std::ptr::read_unaligned(ts.as_ptr() as *const _) };
        assert_eq!((ts.year, ts.month, ts.day), (2022, 6, 30));
        assert_eq!((ts.hour, ts.minute, ts.second), (12, 34, 56));
        assert_eq!(ts.fraction, 789_000_000);
    }

    #[test]
    fn unsupported_pairs_are_rejected() {
        assert!(lookup(WireType::Binary, CType::Long).is_none());
        assert!(lookup(WireType::Timestamp, CType::Double).is_none());
        assert!(lookup(WireType::Int, CType::Timestamp).is_none());
        assert!(lookup(WireType::Double, CType::Date).is_none());
        let mut buf = [0u8; 4];
        let (r, ind) = run(WireType::Binary, b"x", SQL_C_LONG, &mut buf);
        assert_eq!(r.unwrap_err().sqlstate(), "07006");
        assert_eq!(ind, -99);
    }

    #[test]
    fn bool_widens_everywhere() {
        let cell = [1u8];
        for c in [SQL_C_BIT, SQL_C_TINYINT, SQL_C_SHORT, SQL_C_LONG, SQL_C_SBIGINT, SQL_C_FLOAT, SQL_C_DOUBLE] {
            let mut buf = [0u8; 8];
            assert!(matches!(run(WireType::Bool, &cell, c, &mut buf).0, Ok(None)), "c type {c}");
        }
        let mut buf = [0u8; 4];
        run(WireType::Bool, &cell, SQL_C_CHAR, &mut buf).0.unwrap();
        assert_eq!(&buf[..2], b"1\0");
    }
}
