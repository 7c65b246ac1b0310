//! PostgreSQL value decoding into `ScalarValue`.

use crate::types::ScalarValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::Row;

type BoxError = Box<dyn Error + Sync + Send>;

/// `numeric` rendered as its exact decimal string.
struct PgNumeric(String);

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_numeric(raw).map(PgNumeric)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Enum labels travel as plain UTF-8 in the binary protocol.
struct PgEnumLabel(String);

impl<'a> FromSql<'a> for PgEnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(PgEnumLabel(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

/// `inet` and `cidr`, rendered the way the server prints them.
struct PgInet(String);

impl<'a> FromSql<'a> for PgInet {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_inet(raw).map(PgInet)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INET || *ty == Type::CIDR
    }
}

/// `money` as a plain decimal string (two fractional digits, no currency symbol).
struct PgMoney(String);

impl<'a> FromSql<'a> for PgMoney {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_money(raw).map(PgMoney)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::MONEY
    }
}

/// `interval` as an ISO 8601 duration.
struct PgInterval(String);

impl<'a> FromSql<'a> for PgInterval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_interval(raw).map(PgInterval)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

/// Decode the binary `inet`/`cidr` wire format.
///
/// Layout: `family: u8` (2 = IPv4, 3 = IPv6), `bits: u8`, `is_cidr: u8`,
/// `nb: u8`, then `nb` address bytes. `cidr` always prints its mask; `inet`
/// only when it is narrower than a single host.
fn decode_inet(raw: &[u8]) -> Result<String, BoxError> {
    const FAMILY_V4: u8 = 2;
    const FAMILY_V6: u8 = 3;

    if raw.len() < 4 {
        return Err("inet header truncated".into());
    }
    let (family, bits, is_cidr, nb) = (raw[0], raw[1], raw[2] != 0, raw[3] as usize);
    let addr = &raw[4..];
    if addr.len() != nb {
        return Err("inet address length does not match payload".into());
    }

    let (ip, max_bits) = match (family, nb) {
        (FAMILY_V4, 4) => {
            let octets: [u8; 4] = addr.try_into()?;
            (IpAddr::V4(Ipv4Addr::from(octets)), 32)
        }
        (FAMILY_V6, 16) => {
            let octets: [u8; 16] = addr.try_into()?;
            (IpAddr::V6(Ipv6Addr::from(octets)), 128)
        }
        _ => return Err(format!("unknown inet family {} with {} bytes", family, nb).into()),
    };

    if is_cidr || bits != max_bits {
        Ok(format!("{}/{}", ip, bits))
    } else {
        Ok(ip.to_string())
    }
}

/// Decode the binary `money` wire format: an `i64` count of cents.
fn decode_money(raw: &[u8]) -> Result<String, BoxError> {
    let cents = i64::from_be_bytes(raw.try_into()?);
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    Ok(format!("{}{}.{:02}", sign, abs / 100, abs % 100))
}

/// Decode the binary `interval` wire format.
///
/// Layout: `microseconds: i64, days: i32, months: i32`. Each component keeps
/// its own sign, as the server's `iso_8601` interval style prints it.
fn decode_interval(raw: &[u8]) -> Result<String, BoxError> {
    const MICROS_PER_MINUTE: i64 = 60_000_000;
    const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

    if raw.len() != 16 {
        return Err("interval payload must be 16 bytes".into());
    }
    let micros = i64::from_be_bytes(raw[0..8].try_into()?);
    let days = i32::from_be_bytes(raw[8..12].try_into()?);
    let months = i32::from_be_bytes(raw[12..16].try_into()?);

    let (years, months) = (months / 12, months % 12);
    let hours = micros / MICROS_PER_HOUR;
    let minutes = (micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE;
    let second_micros = micros % MICROS_PER_MINUTE;

    let mut out = String::from("P");
    for (value, unit) in [(years, 'Y'), (months, 'M'), (days, 'D')] {
        if value != 0 {
            out.push_str(&format!("{}{}", value, unit));
        }
    }
    if micros != 0 {
        out.push('T');
        if hours != 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes != 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if second_micros != 0 {
            let sign = if second_micros < 0 { "-" } else { "" };
            let abs = second_micros.unsigned_abs();
            let (whole, fraction) = (abs / 1_000_000, abs % 1_000_000);
            if fraction == 0 {
                out.push_str(&format!("{}{}S", sign, whole));
            } else {
                let fraction = format!("{:06}", fraction);
                out.push_str(&format!("{}{}.{}S", sign, whole, fraction.trim_end_matches('0')));
            }
        }
    }
    if out == "P" {
        out.push_str("T0S");
    }
    Ok(out)
}

/// `bytea` in the server's hex output format.
fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Decode the binary `numeric` wire format.
///
/// Layout: `ndigits: i16, weight: i16, sign: u16, dscale: u16`, then
/// `ndigits` base-10000 digits. The value is
/// `sum(digit[i] * 10000^(weight - i))`, printed with `dscale` fractional digits.
fn decode_numeric(raw: &[u8]) -> Result<String, BoxError> {
    const SIGN_NEG: u16 = 0x4000;
    const SIGN_NAN: u16 = 0xC000;
    const SIGN_PINF: u16 = 0xD000;
    const SIGN_NINF: u16 = 0xF000;

    if raw.len() < 8 {
        return Err("numeric header truncated".into());
    }
    let read_i16 = |at: usize| i16::from_be_bytes([raw[at], raw[at + 1]]);
    let ndigits = read_i16(0);
    let weight = read_i16(2) as i32;
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    let dscale = u16::from_be_bytes([raw[6], raw[7]]) as usize;

    match sign {
        SIGN_NAN => return Ok("NaN".to_string()),
        SIGN_PINF => return Ok("Infinity".to_string()),
        SIGN_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    if ndigits < 0 || raw.len() != 8 + ndigits as usize * 2 {
        return Err("numeric digit count does not match payload".into());
    }
    let digits: Vec<i16> = (0..ndigits as usize).map(|i| read_i16(8 + i * 2)).collect();
    let digit_at = |idx: i32| -> i16 {
        if idx < 0 {
            0
        } else {
            digits.get(idx as usize).copied().unwrap_or(0)
        }
    };

    let mut out = String::new();
    if sign == SIGN_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for idx in 0..=weight {
            if idx == 0 {
                out.push_str(&digit_at(idx).to_string());
            } else {
                out.push_str(&format!("{:04}", digit_at(idx)));
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit_at(idx)));
            idx += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

/// Decode one column of a row.
///
/// Types outside the supported scalar set fall back to text when the driver
/// can read them as text, and to `Null` (with a warning) otherwise.
pub fn column_value(row: &Row, idx: usize) -> Result<ScalarValue, tokio_postgres::Error> {
    let ty = row.columns()[idx].type_().clone();

    let value = match ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(ScalarValue::Bool),
        Type::CHAR => row
            .try_get::<_, Option<i8>>(idx)?
            .map(|v| ScalarValue::Text(char::from(v as u8).to_string())),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| ScalarValue::Int(v as i64)),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| ScalarValue::Int(v as i64)),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(ScalarValue::Int),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| ScalarValue::Int(v as i64)),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| ScalarValue::Float(v as f64)),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(ScalarValue::Float),
        Type::NUMERIC => row
            .try_get::<_, Option<PgNumeric>>(idx)?
            .map(|v| ScalarValue::Text(v.0)),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(idx)?
            .map(|v| ScalarValue::Text(v.to_string())),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|v| ScalarValue::Text(v.to_string())),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.map(ScalarValue::Date),
        Type::TIME => row.try_get::<_, Option<NaiveTime>>(idx)?.map(ScalarValue::Time),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(ScalarValue::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(ScalarValue::TimestampTz),
        Type::INTERVAL => row
            .try_get::<_, Option<PgInterval>>(idx)?
            .map(|v| ScalarValue::Text(v.0)),
        Type::INET | Type::CIDR => row
            .try_get::<_, Option<PgInet>>(idx)?
            .map(|v| ScalarValue::Text(v.0)),
        Type::MONEY => row
            .try_get::<_, Option<PgMoney>>(idx)?
            .map(|v| ScalarValue::Text(v.0)),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map(|v| ScalarValue::Text(bytea_hex(&v))),
        ref other => match other.kind() {
            Kind::Enum(_) => row
                .try_get::<_, Option<PgEnumLabel>>(idx)?
                .map(|v| ScalarValue::Text(v.0)),
            Kind::Array(element) => array_value(row, idx, element)?,
            _ if <String as FromSql<'_>>::accepts(other) => {
                row.try_get::<_, Option<String>>(idx)?.map(ScalarValue::Text)
            }
            _ => {
                tracing::warn!(
                    column = row.columns()[idx].name(),
                    pg_type = %other,
                    "unsupported column type, returning null"
                );
                None
            }
        },
    };

    Ok(value.unwrap_or(ScalarValue::Null))
}

/// Read a one-dimensional array column, mapping each element with `wrap`.
fn array_items<'a, T>(
    row: &'a Row,
    idx: usize,
    wrap: impl Fn(T) -> ScalarValue,
) -> Result<Option<ScalarValue>, tokio_postgres::Error>
where
    T: FromSql<'a>,
{
    let items = row.try_get::<_, Option<Vec<Option<T>>>>(idx)?;
    Ok(items.map(|items| {
        ScalarValue::Array(
            items
                .into_iter()
                .map(|item| item.map(&wrap).unwrap_or(ScalarValue::Null))
                .collect(),
        )
    }))
}

/// Decode an array column by element type.
///
/// Multi-dimensional arrays are rejected by the driver and surface as a
/// decode failure.
fn array_value(
    row: &Row,
    idx: usize,
    element: &Type,
) -> Result<Option<ScalarValue>, tokio_postgres::Error> {
    match *element {
        Type::BOOL => array_items(row, idx, ScalarValue::Bool),
        Type::INT2 => array_items(row, idx, |v: i16| ScalarValue::Int(v as i64)),
        Type::INT4 => array_items(row, idx, |v: i32| ScalarValue::Int(v as i64)),
        Type::INT8 => array_items(row, idx, ScalarValue::Int),
        Type::FLOAT4 => array_items(row, idx, |v: f32| ScalarValue::Float(v as f64)),
        Type::FLOAT8 => array_items(row, idx, ScalarValue::Float),
        Type::NUMERIC => array_items(row, idx, |v: PgNumeric| ScalarValue::Text(v.0)),
        Type::UUID => array_items(row, idx, |v: uuid::Uuid| ScalarValue::Text(v.to_string())),
        Type::DATE => array_items(row, idx, ScalarValue::Date),
        Type::TIMESTAMP => array_items(row, idx, ScalarValue::Timestamp),
        Type::TIMESTAMPTZ => array_items(row, idx, ScalarValue::TimestampTz),
        Type::INET | Type::CIDR => array_items(row, idx, |v: PgInet| ScalarValue::Text(v.0)),
        ref other if <String as FromSql<'_>>::accepts(other) => {
            array_items(row, idx, ScalarValue::Text)
        }
        ref other => {
            tracing::warn!(
                column = row.columns()[idx].name(),
                element_type = %other,
                "unsupported array element type, returning null"
            );
            Ok(None)
        }
    }
}

/// Decode every column of a row, in column order.
pub fn row_values(row: &Row) -> Result<Vec<ScalarValue>, tokio_postgres::Error> {
    (0..row.len()).map(|idx| column_value(row, idx)).collect()
}
