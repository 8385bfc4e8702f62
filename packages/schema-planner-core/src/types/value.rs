//! Literal validation and rendering for DEFAULT and SHARED values.

use super::data_type::DataType;
use super::type_table::TypeTable;
use crate::error::SchemaError;

/// Keywords accepted verbatim as defaults, with the domains they fit.
const KEYWORD_DEFAULTS: &[(&str, fn(&DataType) -> bool)] = &[
    ("SYSDATE", is_date_like),
    ("CURRENT_DATE", is_date_like),
    ("SYSTIME", is_time),
    ("CURRENT_TIME", is_time),
    ("SYS_TIMESTAMP", is_timestamp_like),
    ("SYSTIMESTAMP", is_timestamp_like),
    ("CURRENT_TIMESTAMP", is_timestamp_like),
    ("SYS_DATETIME", is_timestamp_like),
    ("SYSDATETIME", is_timestamp_like),
    ("CURRENT_DATETIME", is_timestamp_like),
    ("CURRENT_USER", DataType::is_character),
    ("USER", DataType::is_character),
];

fn is_date_like(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date | DataType::Timestamp | DataType::Datetime
    )
}

fn is_time(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Time)
}

fn is_timestamp_like(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Timestamp | DataType::Datetime)
}

impl TypeTable {
    /// Validates a raw literal against a domain and renders it for DDL.
    ///
    /// # Arguments
    /// * `data_type` - Declared domain of the attribute
    /// * `raw` - Value as typed by the user, quoted or not
    ///
    /// # Returns
    /// `Result<String, SchemaError>` with the literal ready to embed in a
    /// statement, or `MalformedValue`/`ValueOutOfRange`.
    pub fn format_value(&self, data_type: &DataType, raw: &str) -> Result<String, SchemaError> {
        let trimmed = raw.trim();
        let malformed = || SchemaError::MalformedValue {
            data_type: data_type.to_string(),
            value: raw.to_string(),
        };
        if trimmed.is_empty() {
            return Err(malformed());
        }

        let upper = trimmed.to_ascii_uppercase();
        if upper == "NULL" {
            return Ok(upper);
        }
        if let Some((keyword, _)) = KEYWORD_DEFAULTS
            .iter()
            .find(|(keyword, fits)| *keyword == upper && fits(data_type))
        {
            return Ok(keyword.to_string());
        }

        match data_type {
            DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                let value = parse_integer(trimmed).ok_or_else(malformed)?;
                self.check_range(data_type, value)?;
                Ok(value.to_string())
            }
            DataType::Numeric { precision, scale } => {
                format_decimal(trimmed, *precision, *scale, data_type).ok_or_else(malformed)?
            }
            DataType::Float | DataType::Double | DataType::Monetary => {
                match trimmed.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(trimmed.trim_start_matches('+').to_string()),
                    _ => Err(malformed()),
                }
            }
            DataType::Char(_) | DataType::Varchar(_) => Ok(quote(&unquote(trimmed))),
            DataType::NChar(_) | DataType::NVarchar(_) => {
                let body = strip_prefix_ignore_case(trimmed, "N").filter(|s| s.starts_with('\''));
                Ok(format!("N{}", quote(&unquote(body.unwrap_or(trimmed)))))
            }
            DataType::Bit(_) | DataType::BitVarying(_) => format_bit(trimmed).ok_or_else(malformed),
            DataType::Date => format_temporal(trimmed, "DATE", is_date).ok_or_else(malformed),
            DataType::Time => format_temporal(trimmed, "TIME", is_time_literal).ok_or_else(malformed),
            DataType::Timestamp => {
                format_temporal(trimmed, "TIMESTAMP", |s| is_timestamp(s, false)).ok_or_else(malformed)
            }
            DataType::Datetime => {
                format_temporal(trimmed, "DATETIME", |s| is_timestamp(s, true)).ok_or_else(malformed)
            }
            DataType::Set(_) | DataType::Multiset(_) | DataType::Sequence(_) => {
                if trimmed.starts_with('{') && trimmed.ends_with('}') {
                    Ok(trimmed.to_string())
                } else {
                    Err(malformed())
                }
            }
            DataType::Object(_) => Err(malformed()),
        }
    }
}

/// Parses a plain integer literal with an optional sign.
pub fn parse_integer(text: &str) -> Option<i128> {
    let text = text.trim();
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.trim_start_matches('+').parse::<i128>().ok()
}

fn format_decimal(
    text: &str,
    precision: u32,
    scale: u32,
    data_type: &DataType,
) -> Option<Result<String, SchemaError>> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac_part.len() > scale as usize {
        return None;
    }

    let significant = int_part.trim_start_matches('0').len();
    let allowed = precision.saturating_sub(scale) as usize;
    if significant > allowed {
        let max = format!(
            "{}{}",
            "9".repeat(allowed.max(1)),
            if scale > 0 {
                format!(".{}", "9".repeat(scale as usize))
            } else {
                String::new()
            }
        );
        return Some(Err(SchemaError::ValueOutOfRange {
            data_type: data_type.to_string(),
            value: text.to_string(),
            min: format!("-{}", max),
            max,
        }));
    }
    Some(Ok(text.trim_start_matches('+').to_string()))
}

fn format_bit(text: &str) -> Option<String> {
    for prefix in ["B", "X"] {
        if let Some(body) = strip_prefix_ignore_case(text, prefix) {
            if body.len() >= 2 && body.starts_with('\'') && body.ends_with('\'') {
                let inner = &body[1..body.len() - 1];
                let valid = if prefix == "B" {
                    inner.bytes().all(|b| b == b'0' || b == b'1')
                } else {
                    inner.bytes().all(|b| b.is_ascii_hexdigit())
                };
                return valid.then(|| format!("{}'{}'", prefix, inner));
            }
        }
    }

    let inner = unquote(text);
    if !inner.is_empty() && inner.bytes().all(|b| b == b'0' || b == b'1') {
        Some(format!("B'{}'", inner))
    } else if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(format!("X'{}'", inner))
    } else {
        None
    }
}

fn format_temporal(text: &str, keyword: &str, valid: impl Fn(&str) -> bool) -> Option<String> {
    let body = strip_prefix_ignore_case(text, keyword)
        .map(str::trim_start)
        .filter(|s| s.starts_with('\''))
        .unwrap_or(text);
    let inner = unquote(body);
    valid(inner.trim()).then(|| format!("{}'{}'", keyword, inner.trim()))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn unquote(text: &str) -> String {
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        text[1..text.len() - 1].replace("''", "'")
    } else {
        text.to_string()
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn fixed_digits(text: &str, len: usize) -> Option<u32> {
    if text.len() != len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn is_date(text: &str) -> bool {
    let mut parts = text.split('-');
    let (Some(y), Some(m), Some(d), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Some(year), Some(month), Some(day)) =
        (fixed_digits(y, 4), fixed_digits(m, 2), fixed_digits(d, 2))
    else {
        return false;
    };
    if !(1..=12).contains(&month) || day < 1 {
        return false;
    }
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days = match month {
        2 if leap => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    };
    day <= days
}

fn is_time_literal(text: &str) -> bool {
    let mut parts = text.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    matches!(
        (fixed_digits(h, 2), fixed_digits(m, 2), fixed_digits(s, 2)),
        (Some(h), Some(m), Some(s)) if h <= 23 && m <= 59 && s <= 59
    )
}

fn is_timestamp(text: &str, with_millis: bool) -> bool {
    let Some((date, time)) = text.split_once(' ') else {
        return false;
    };
    let time = time.trim();
    let time = match (with_millis, time.split_once('.')) {
        (true, Some((hms, millis))) => {
            if millis.is_empty() || millis.len() > 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
            hms
        }
        (false, Some(_)) => return false,
        (_, None) => time,
    };
    is_date(date) && is_time_literal(time)
}
