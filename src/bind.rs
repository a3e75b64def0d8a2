//! Input parameters: capability table, per-statement descriptors and
//! materialization into wire binds at execute time.

use crate::convert::CType;
use crate::engine::{WireBind, WireType};
use crate::error::DriverError;
use crate::timestamp;
use crate::types::*;
use std::ffi::CStr;

/// Wire type a `(C type, SQL type)` pair binds as, `None` if the pair is unsupported.
pub fn resolve(c_type: CType, sql_type: SQLSMALLINT) -> Option<WireType> {
    use CType as C;
    let numeric_sql = |sql_type| match sql_type {
        SQL_BIT => Some(WireType::Bool),
        SQL_TINYINT => Some(WireType::TinyInt),
        SQL_SMALLINT => Some(WireType::SmallInt),
        SQL_INTEGER => Some(WireType::Int),
        SQL_BIGINT => Some(WireType::BigInt),
        SQL_FLOAT | SQL_REAL => Some(WireType::Float),
        SQL_DOUBLE => Some(WireType::Double),
        SQL_CHAR | SQL_VARCHAR | SQL_LONGVARCHAR => Some(WireType::NChar),
        _ => None,
    };
    match c_type {
        C::Bit | C::TinyInt | C::Short | C::Long | C::SBigInt | C::Float | C::Double | C::Numeric => {
            numeric_sql(sql_type)
        }
        C::Date | C::Time | C::Timestamp => match sql_type {
            SQL_CHAR | SQL_VARCHAR | SQL_LONGVARCHAR => Some(WireType::NChar),
            SQL_TIMESTAMP | SQL_TYPE_TIMESTAMP => Some(WireType::Timestamp),
            _ => None,
        },
        C::Char | C::Binary => match sql_type {
            SQL_BINARY | SQL_VARBINARY | SQL_LONGVARBINARY => Some(WireType::Binary),
            SQL_TIMESTAMP | SQL_TYPE_TIMESTAMP => Some(WireType::Timestamp),
            other => numeric_sql(other),
        },
    }
}

/// One bound input parameter, pointing into caller memory until execute.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub c_type: CType,
    pub sql_type: SQLSMALLINT,
    pub wire_type: WireType,
    pub length_precision: SQLULEN,
    pub scale: SQLSMALLINT,
    pub value: SQLPOINTER,
    pub buffer_length: SQLLEN,
    pub indicator: *mut SQLLEN,
}

/// Descriptor slots and their wire binds, index aligned. `None` marks a slot
/// declared by a higher bind but never bound itself.
#[derive(Default)]
pub struct ParamSet {
    descriptors: Vec<Option<ParamDescriptor>>,
    binds: Vec<WireBind>,
}

impl ParamSet {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Stores `desc` at 1-based `index`, growing both arrays as needed.
    pub fn bind(&mut self, index: usize, desc: ParamDescriptor) {
        debug_assert!(index >= 1);
        if self.descriptors.len() < index {
            self.descriptors.resize(index, None);
            self.binds.resize_with(index, WireBind::unset);
        }
        self.descriptors[index - 1] = Some(desc);
        self.binds[index - 1] = WireBind::unset();
    }

    pub fn clear(&mut self) {
        self.descriptors.clear();
        self.binds.clear();
    }

    /// Reads every caller value and refreshes the wire binds.
    ///
    /// # Safety
    ///
    /// Every bound value and indicator pointer must still be valid.
    pub unsafe fn materialize(&mut self) -> Result<&[WireBind], DriverError> {
        for (i, slot) in self.descriptors.iter().enumerate() {
            let desc = slot.as_ref().ok_or(DriverError::UnboundParameter(i + 1))?;
            self.binds[i] = materialize_one(i + 1, desc)?;
        }
        Ok(&self.binds)
    }
}

/// A caller value read out of its C representation.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Int(i64),
    Real32(f32),
    Real(f64),
    Text(Vec<u8>),
    Bytes(Vec<u8>),
    Millis(i64),
}

unsafe fn read<T: Copy>(ptr: SQLPOINTER) -> T {
    std::ptr::read_unaligned(ptr as *const T)
}

unsafe fn materialize_one(index: usize, desc: &ParamDescriptor) -> Result<WireBind, DriverError> {
    let ind = if desc.indicator.is_null() {
        None
    } else {
        Some(*desc.indicator)
    };
    if ind == Some(SQL_NULL_DATA) || desc.value.is_null() {
        return Ok(WireBind::null(desc.wire_type));
    }
    let input = read_input(index, desc, ind)?;
    encode(index, desc.wire_type, input).map(|buf| WireBind::value(desc.wire_type, buf))
}

unsafe fn read_input(
    index: usize,
    desc: &ParamDescriptor,
    ind: Option<SQLLEN>,
) -> Result<Input, DriverError> {
    let ptr = desc.value;
    Ok(match desc.c_type {
        CType::Bit => Input::Int((read::<u8>(ptr) != 0) as i64),
        CType::TinyInt => Input::Int(read::<i8>(ptr) as i64),
        CType::Short => Input::Int(read::<i16>(ptr) as i64),
        CType::Long => Input::Int(read::<i32>(ptr) as i64),
        CType::SBigInt => Input::Int(read::<i64>(ptr)),
        CType::Float => Input::Real32(read::<f32>(ptr)),
        CType::Double => Input::Real(read::<f64>(ptr)),
        CType::Numeric => numeric_input(index, &read::<SqlNumericStruct>(ptr))?,
        CType::Timestamp => Input::Millis(
            timestamp::from_struct(&read::<SqlTimestampStruct>(ptr))
                .ok_or_else(|| DriverError::DatetimeOverflow(format!("parameter [@{index}]")))?,
        ),
        CType::Date => Input::Millis(
            timestamp::from_date(&read::<SqlDateStruct>(ptr))
                .ok_or_else(|| DriverError::DatetimeOverflow(format!("parameter [@{index}]")))?,
        ),
        CType::Time => Input::Millis(
            timestamp::from_time(&read::<SqlTimeStruct>(ptr))
                .ok_or_else(|| DriverError::DatetimeOverflow(format!("parameter [@{index}]")))?,
        ),
        CType::Char | CType::Binary => {
            let len = match ind {
                None => return Err(DriverError::BadLength(index)),
                Some(SQL_NTS) => CStr::from_ptr(ptr as *const std::ffi::c_char).to_bytes().len(),
                Some(n) if n < 0 => return Err(DriverError::BadLength(index)),
                Some(n) => n as usize,
            };
            let max = desc.length_precision;
            if max > 0 && len > max {
                return Err(DriverError::ParameterTooLong { index, len, max });
            }
            let bytes = std::slice::from_raw_parts(ptr as *const u8, len).to_vec();
            if desc.c_type == CType::Char {
                Input::Text(bytes)
            } else {
                Input::Bytes(bytes)
            }
        }
    })
}

fn numeric_input(index: usize, n: &SqlNumericStruct) -> Result<Input, DriverError> {
    let magnitude = u128::from_le_bytes(n.val);
    let signed = if n.sign == 1 {
        magnitude as f64
    } else {
        -(magnitude as f64)
    };
    if n.scale == 0 {
        let v = i128::try_from(magnitude)
            .ok()
            .map(|m| if n.sign == 1 { m } else { -m })
            .and_then(|m| i64::try_from(m).ok())
            .ok_or_else(|| DriverError::OutOfRange(format!("parameter [@{index}]")))?;
        return Ok(Input::Int(v));
    }
    Ok(Input::Real(signed / 10f64.powi(n.scale as i32)))
}

fn parse_text_number(index: usize, text: &[u8]) -> Result<Input, DriverError> {
    let bad = || DriverError::InvalidCharValue(format!("parameter [@{index}]"));
    let s = std::str::from_utf8(text).map_err(|_| bad())?.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Input::Int(i));
    }
    s.parse::<f64>().map(Input::Real).map_err(|_| bad())
}

fn encode(index: usize, wire: WireType, input: Input) -> Result<Vec<u8>, DriverError> {
    let range = || DriverError::OutOfRange(format!("parameter [@{index}] as {wire}"));
    let input = match (wire, input) {
        (
            WireType::Bool
            | WireType::TinyInt
            | WireType::SmallInt
            | WireType::Int
            | WireType::BigInt
            | WireType::Float
            | WireType::Double,
            Input::Text(t) | Input::Bytes(t),
        ) => parse_text_number(index, &t)?,
        (WireType::NChar, Input::Real32(f)) => return Ok(f.to_string().into_bytes()),
        (_, Input::Real32(f)) => Input::Real(f as f64),
        (_, other) => other,
    };

    // Fractions are dropped toward zero on integer columns.
    let integral = |lo: i64, hi: i64| -> Result<i64, DriverError> {
        match input {
            Input::Int(i) if (lo..=hi).contains(&i) => Ok(i),
            Input::Real(f) if f.is_finite() && f.trunc() >= lo as f64 && f.trunc() < hi as f64 + 1.0 => {
                Ok(f.trunc() as i64)
            }
            _ => Err(range()),
        }
    };

    Ok(match wire {
        WireType::Bool => match input {
            Input::Int(i @ (0 | 1)) => vec![i as u8],
            Input::Real(f) if f == 0.0 || f == 1.0 => vec![f as u8],
            _ => return Err(range()),
        },
        WireType::TinyInt => (integral(i8::MIN as i64, i8::MAX as i64)? as i8).to_le_bytes().to_vec(),
        WireType::SmallInt => (integral(i16::MIN as i64, i16::MAX as i64)? as i16).to_le_bytes().to_vec(),
        WireType::Int => (integral(i32::MIN as i64, i32::MAX as i64)? as i32).to_le_bytes().to_vec(),
        WireType::BigInt => integral(i64::MIN, i64::MAX)?.to_le_bytes().to_vec(),
        WireType::Float => {
            let f = match input {
                Input::Int(i) => i as f32,
                Input::Real(f) if f.is_finite() && f.abs() > f32::MAX as f64 => return Err(range()),
                Input::Real(f) => f as f32,
                _ => return Err(range()),
            };
            f.to_le_bytes().to_vec()
        }
        WireType::Double => match input {
            Input::Int(i) => (i as f64).to_le_bytes().to_vec(),
            Input::Real(f) => f.to_le_bytes().to_vec(),
            _ => return Err(range()),
        },
        WireType::NChar => match input {
            Input::Int(i) => i.to_string().into_bytes(),
            Input::Real(f) => f.to_string().into_bytes(),
            Input::Real32(f) => f.to_string().into_bytes(),
            Input::Text(t) | Input::Bytes(t) => t,
            Input::Millis(ms) => timestamp::format_millis(ms)
                .ok_or_else(|| DriverError::DatetimeOverflow(format!("parameter [@{index}]")))?
                .into_bytes(),
        },
        WireType::Binary => match input {
            Input::Text(t) | Input::Bytes(t) => t,
            _ => return Err(range()),
        },
        WireType::Timestamp => match input {
            Input::Millis(ms) => ms.to_le_bytes().to_vec(),
            Input::Text(t) | Input::Bytes(t) => {
                let ms = std::str::from_utf8(&t)
                    .ok()
                    .and_then(timestamp::parse)
                    .ok_or_else(|| DriverError::InvalidCharValue(format!("parameter [@{index}] as {wire}")))?;
                ms.to_le_bytes().to_vec()
            }
            _ => return Err(range()),
        },
        WireType::Null => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    fn desc(c_type: CType, sql_type: SQLSMALLINT, value: SQLPOINTER, indicator: *mut SQLLEN) -> ParamDescriptor {
        ParamDescriptor {
            c_type,
            sql_type,
            wire_type: resolve(c_type, sql_type).unwrap(),
            length_precision: 0,
            scale: 0,
            value,
            buffer_length: 0,
            indicator,
        }
    }

    #[test]
    fn capability_table() {
        assert_eq!(resolve(CType::Long, SQL_BIGINT), Some(WireType::BigInt));
        assert_eq!(resolve(CType::Bit, SQL_DOUBLE), Some(WireType::Double));
        assert_eq!(resolve(CType::Char, SQL_DOUBLE), Some(WireType::Double));
        assert_eq!(resolve(CType::Short, SQL_REAL), Some(WireType::Float));
        assert_eq!(resolve(CType::Double, SQL_VARCHAR), Some(WireType::NChar));
        assert_eq!(resolve(CType::Char, SQL_VARBINARY), Some(WireType::Binary));
        assert_eq!(resolve(CType::Binary, SQL_TYPE_TIMESTAMP), Some(WireType::Timestamp));
        assert_eq!(resolve(CType::Timestamp, SQL_TIMESTAMP), Some(WireType::Timestamp));
        // Timestamps only come from strings, binaries and date/time structs.
        assert_eq!(resolve(CType::SBigInt, SQL_TIMESTAMP), None);
        assert_eq!(resolve(CType::Long, SQL_VARBINARY), None);
        assert_eq!(resolve(CType::Date, SQL_INTEGER), None);
        assert_eq!(resolve(CType::Long, SQL_DECIMAL), None);
    }

    #[test]
    fn sparse_slots_grow_and_keep_entries() {
        let mut v = 7i32;
        let mut set = ParamSet::default();
        set.bind(3, desc(CType::Long, SQL_INTEGER, &mut v as *mut i32 as SQLPOINTER, ptr::null_mut()));
        assert_eq!(set.len(), 3);
        let err = unsafe { set.materialize() }.unwrap_err();
        assert!(matches!(err, DriverError::UnboundParameter(1)));
        set.bind(1, desc(CType::Long, SQL_INTEGER, &mut v as *mut i32 as SQLPOINTER, ptr::null_mut()));
        assert_eq!(set.len(), 3);

        let err = unsafe { set.materialize() }.unwrap_err();
        assert!(matches!(err, DriverError::UnboundParameter(2)));
    }

    #[test]
    fn materializes_numbers_and_nulls() {
        let mut a = 42i32;
        let mut b = 1.5f64;
        let mut null_ind = SQL_NULL_DATA;
        let mut set = ParamSet::default();
        set.bind(1, desc(CType::Long, SQL_BIGINT, &mut a as *mut i32 as SQLPOINTER, ptr::null_mut()));
        set.bind(2, desc(CType::Double, SQL_FLOAT, &mut b as *mut f64 as SQLPOINTER, ptr::null_mut()));
        set.bind(3, desc(CType::Long, SQL_INTEGER, &mut a as *mut i32 as SQLPOINTER, &mut null_ind));
        let binds = unsafe { set.materialize() }.unwrap();
        assert_eq!(binds[0], WireBind::value(WireType::BigInt, 42i64.to_le_bytes().to_vec()));
        assert_eq!(binds[1], WireBind::value(WireType::Float, 1.5f32.to_le_bytes().to_vec()));
        assert!(binds[2].is_null);
        assert_eq!(binds[2].buffer_type, WireType::Int);
    }

    #[test]
    fn strings_need_a_length() {
        let text = b"hello\0";
        let mut set = ParamSet::default();
        set.bind(1, desc(CType::Char, SQL_VARCHAR, text.as_ptr() as SQLPOINTER, ptr::null_mut()));
        assert!(matches!(unsafe { set.materialize() }, Err(DriverError::BadLength(1))));

        let mut nts = SQL_NTS;
        set.bind(1, desc(CType::Char, SQL_VARCHAR, text.as_ptr() as SQLPOINTER, &mut nts));
        let binds = unsafe { set.materialize() }.unwrap();
        assert_eq!(binds[0].buffer, b"hello");
        assert_eq!(binds[0].length, 5);

        let mut three: SQLLEN = 3;
        set.bind(1, desc(CType::Char, SQL_VARCHAR, text.as_ptr() as SQLPOINTER, &mut three));
        assert_eq!(unsafe { set.materialize() }.unwrap()[0].buffer, b"hel");
    }

    #[test]
    fn strings_longer_than_declared_are_rejected() {
        let text = b"toolong";
        let mut len: SQLLEN = 7;
        let mut d = desc(CType::Char, SQL_VARCHAR, text.as_ptr() as SQLPOINTER, &mut len);
        d.length_precision = 4;
        let mut set = ParamSet::default();
        set.bind(1, d);
        let err = unsafe { set.materialize() }.unwrap_err();
        assert!(matches!(err, DriverError::ParameterTooLong { index: 1, len: 7, max: 4 }));
    }

    #[test]
    fn text_into_numeric_columns() {
        let text = b" 12";
        let mut len: SQLLEN = 3;
        let mut set = ParamSet::default();
        set.bind(1, desc(CType::Char, SQL_SMALLINT, text.as_ptr() as SQLPOINTER, &mut len));
        assert_eq!(unsafe { set.materialize() }.unwrap()[0].buffer, 12i16.to_le_bytes());

        let bad = b"12x";
        set.bind(1, desc(CType::Char, SQL_SMALLINT, bad.as_ptr() as SQLPOINTER, &mut len));
        assert_eq!(unsafe { set.materialize() }.unwrap_err().sqlstate(), "22018");
    }

    #[test]
    fn narrowing_out_of_range() {
        let mut big = 300i64;
        let mut set = ParamSet::default();
        set.bind(1, desc(CType::SBigInt, SQL_TINYINT, &mut big as *mut i64 as SQLPOINTER, ptr::null_mut()));
        assert_eq!(unsafe { set.materialize() }.unwrap_err().sqlstate(), "22003");
    }

    #[test]
    fn timestamp_from_text_and_struct() {
        let text = b"2021-01-02 03:04:05.006";
        let mut len = text.len() as SQLLEN;
        let mut set = ParamSet::default();
        set.bind(1, desc(CType::Char, SQL_TIMESTAMP, text.as_ptr() as SQLPOINTER, &mut len));
        let expected = timestamp::parse("2021-01-02 03:04:05.006").unwrap();
        assert_eq!(unsafe { set.materialize() }.unwrap()[0].buffer, expected.to_le_bytes());

        let mut ts = SqlTimestampStruct {
            year: 2021,
            month: 1,
            day: 2,
            hour: 3,
            minute: 4,
            second: 5,
            fraction: 6_000_000,
        };
        set.bind(1, desc(CType::Timestamp, SQL_TYPE_TIMESTAMP, &mut ts as *mut _ as SQLPOINTER, ptr::null_mut()));
        assert_eq!(unsafe { set.materialize() }.unwrap()[0].buffer, expected.to_le_bytes());
    }

    #[test]
    fn numbers_into_text_columns() {
        let mut n = -17i32;
        let mut set = ParamSet::default();
        set.bind(1, desc(CType::Long, SQL_VARCHAR, &mut n as *mut i32 as SQLPOINTER, ptr::null_mut()));
        assert_eq!(unsafe { set.materialize() }.unwrap()[0].buffer, b"-17");
    }

    #[test]
    fn numeric_struct_is_scaled() {
        let mut val = [0u8; 16];
        val[..2].copy_from_slice(&12345u16.to_le_bytes());
        let mut n = SqlNumericStruct {
            precision: 5,
            scale: 2,
            sign: 0,
            val,
        };
        let mut set = ParamSet::default();
        set.bind(1, desc(CType::Numeric, SQL_DOUBLE, &mut n as *mut _ as SQLPOINTER, ptr::null_mut()));
        assert_eq!(unsafe { set.materialize() }.unwrap()[0].buffer, (-123.45f64).to_le_bytes());
    }
}
