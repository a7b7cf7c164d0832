use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use postgres_types::{FromSql, Kind, Type};
use std::error::Error;
use std::fmt::{self, Write};
use uuid::Uuid;

/// A single cell of a result set.
///
/// The set of variants is closed: every server type is decoded into one of
/// them when the row is read, and `Display` renders each one without
/// looking at anything but the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
    Other(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            // Rust prints the shortest representation that round-trips
            Value::Float(d) => write!(f, "{}", d),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Other(s) => f.write_str(s),
        }
    }
}

impl Value {
    /// Widens a `real` through its own shortest text so `0.1::real`
    /// renders as `0.1` rather than `0.10000000149011612`.
    pub fn from_f32(f: f32) -> Self {
        Value::Float(f.to_string().parse::<f64>().unwrap_or(f64::from(f)))
    }
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::INT2 => Value::Integer(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Integer(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Integer(i64::from_sql(ty, raw)?),
            Type::OID => Value::Integer(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::from_f32(f32::from_sql(ty, raw)?),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Value::Text(String::from_sql(ty, raw)?)
            }
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::Other(
                DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::BOOL => Value::Other(bool::from_sql(ty, raw)?.to_string()),
            Type::NUMERIC => Value::Other(numeric_to_string(raw)?),
            Type::DATE => Value::Other(NaiveDate::from_sql(ty, raw)?.format("%Y-%m-%d").to_string()),
            Type::TIME => Value::Other(
                NaiveTime::from_sql(ty, raw)?
                    .format("%H:%M:%S%.f")
                    .to_string(),
            ),
            Type::UUID => Value::Other(Uuid::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => {
                Value::Other(serde_json::Value::from_sql(ty, raw)?.to_string())
            }
            _ => match ty.kind() {
                Kind::Array(_) => match Vec::<Value>::from_sql(ty, raw) {
                    Ok(items) => Value::Other(render_array(&items)),
                    Err(_) => opaque(raw),
                },
                _ => opaque(raw),
            },
        };

        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Renders a binary `numeric` the way the server prints it.
///
/// The wire value is a header of four 16-bit words (digit count, weight of
/// the first digit, sign, display scale) followed by base-10000 digits.
/// Any precision and the special values are supported.
fn numeric_to_string(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    if raw.len() < 8 {
        return Err("invalid numeric header".into());
    }

    let word = |i: usize| u16::from_be_bytes([raw[i], raw[i + 1]]);
    let ndigits = usize::from(word(0));
    let weight = i32::from(word(2) as i16);
    let sign = word(4);
    let dscale = usize::from(word(6));

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid numeric sign: {:#06x}", other).into()),
    }

    if raw.len() != 8 + 2 * ndigits {
        return Err("invalid numeric length".into());
    }

    let digit = |idx: i32| -> u16 {
        match usize::try_from(idx) {
            Ok(idx) if idx < ndigits => word(8 + 2 * idx),
            _ => 0,
        }
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        write!(out, "{}", digit(0))?;
        for idx in 1..=weight {
            write!(out, "{:04}", digit(idx))?;
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit(idx))?;
            idx += 1;
        }
        fraction.truncate(dscale);

        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

fn render_array(items: &[Value]) -> String {
    let inner: Vec<String> = items.iter().map(Value::to_string).collect();
    format!("{{{}}}", inner.join(","))
}

// Enums and most extension types arrive as text even in binary format.
fn opaque(raw: &[u8]) -> Value {
    match std::str::from_utf8(raw) {
        Ok(s) => Value::Other(s.to_string()),
        Err(_) => Value::Other(hex::encode(raw)),
    }
}
