use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::TypeError;

/// Maximum length of a variable character string (`STRING`).
pub const MAX_CHAR_SIZE: u32 = 1_073_741_823;

/// Maximum length of a national character string.
pub const MAX_NCHAR_SIZE: u32 = 536_870_911;

/// Maximum NUMERIC precision.
pub const MAX_NUMERIC_PRECISION: u32 = 38;

/// Column domain with its parameters.
///
/// Serialized as its canonical text (`"VARCHAR(255)"`), so schema files stay
/// readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    SmallInt,
    Integer,
    BigInt,
    Numeric { precision: u32, scale: u32 },
    Float,
    Double,
    Monetary,
    Char(u32),
    Varchar(u32),
    NChar(u32),
    NVarchar(u32),
    Bit(u32),
    BitVarying(u32),
    Date,
    Time,
    Timestamp,
    Datetime,
    Set(Box<DataType>),
    Multiset(Box<DataType>),
    Sequence(Box<DataType>),
    /// Reference to an instance of the named class
    Object(String),
}

/// Domain family, the unit of compatibility and of the limits table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Float,
    Double,
    Monetary,
    Char,
    Varchar,
    NChar,
    NVarchar,
    Bit,
    BitVarying,
    Date,
    Time,
    Timestamp,
    Datetime,
    Set,
    Multiset,
    Sequence,
    Object,
}

impl DataType {
    /// Parses the textual form of a domain.
    ///
    /// Accepts the usual aliases (`INT`, `DECIMAL`, `STRING`, `CHARACTER VARYING`,
    /// `LIST`, `SET_OF(..)`) and a double-quoted class name for object domains.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TypeError::Malformed {
                text: text.to_string(),
            });
        }

        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            let class = &trimmed[1..trimmed.len() - 1];
            if class.is_empty() {
                return Err(TypeError::Malformed {
                    text: text.to_string(),
                });
            }
            return Ok(DataType::Object(class.to_string()));
        }

        let (name, params) = match trimmed.find('(') {
            Some(open) => {
                if !trimmed.ends_with(')') {
                    return Err(TypeError::Malformed {
                        text: text.to_string(),
                    });
                }
                (
                    &trimmed[..open],
                    Some(trimmed[open + 1..trimmed.len() - 1].trim()),
                )
            }
            None => (trimmed, None),
        };
        let name = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        match name.as_str() {
            "SMALLINT" | "SHORT" => no_params(&name, params, DataType::SmallInt),
            "INTEGER" | "INT" => no_params(&name, params, DataType::Integer),
            "BIGINT" => no_params(&name, params, DataType::BigInt),
            "NUMERIC" | "DECIMAL" | "DEC" => parse_numeric(text, params),
            "FLOAT" | "REAL" => no_params(&name, params, DataType::Float),
            "DOUBLE" | "DOUBLE PRECISION" => no_params(&name, params, DataType::Double),
            "MONETARY" => no_params(&name, params, DataType::Monetary),
            "CHAR" | "CHARACTER" => Ok(DataType::Char(parse_size(text, params, 1)?)),
            "VARCHAR" | "CHAR VARYING" | "CHARACTER VARYING" => {
                Ok(DataType::Varchar(parse_size(text, params, MAX_CHAR_SIZE)?))
            }
            "STRING" => no_params(&name, params, DataType::Varchar(MAX_CHAR_SIZE)),
            "NCHAR" | "NATIONAL CHAR" | "NATIONAL CHARACTER" => {
                Ok(DataType::NChar(parse_size(text, params, 1)?))
            }
            "NCHAR VARYING" | "NATIONAL CHAR VARYING" | "NATIONAL CHARACTER VARYING" => {
                Ok(DataType::NVarchar(parse_size(text, params, MAX_NCHAR_SIZE)?))
            }
            "BIT" => Ok(DataType::Bit(parse_size(text, params, 1)?)),
            "BIT VARYING" => Ok(DataType::BitVarying(parse_size(
                text,
                params,
                MAX_CHAR_SIZE,
            )?)),
            "DATE" => no_params(&name, params, DataType::Date),
            "TIME" => no_params(&name, params, DataType::Time),
            "TIMESTAMP" => no_params(&name, params, DataType::Timestamp),
            "DATETIME" => no_params(&name, params, DataType::Datetime),
            "SET" | "SET_OF" => Ok(DataType::Set(Box::new(parse_element(text, params)?))),
            "MULTISET" | "MULTISET_OF" => {
                Ok(DataType::Multiset(Box::new(parse_element(text, params)?)))
            }
            "SEQUENCE" | "SEQUENCE_OF" | "LIST" => {
                Ok(DataType::Sequence(Box::new(parse_element(text, params)?)))
            }
            _ => Err(TypeError::UnknownType { name }),
        }
    }

    /// Returns the domain family.
    pub fn family(&self) -> TypeFamily {
        match self {
            DataType::SmallInt => TypeFamily::SmallInt,
            DataType::Integer => TypeFamily::Integer,
            DataType::BigInt => TypeFamily::BigInt,
            DataType::Numeric { .. } => TypeFamily::Numeric,
            DataType::Float => TypeFamily::Float,
            DataType::Double => TypeFamily::Double,
            DataType::Monetary => TypeFamily::Monetary,
            DataType::Char(_) => TypeFamily::Char,
            DataType::Varchar(_) => TypeFamily::Varchar,
            DataType::NChar(_) => TypeFamily::NChar,
            DataType::NVarchar(_) => TypeFamily::NVarchar,
            DataType::Bit(_) => TypeFamily::Bit,
            DataType::BitVarying(_) => TypeFamily::BitVarying,
            DataType::Date => TypeFamily::Date,
            DataType::Time => TypeFamily::Time,
            DataType::Timestamp => TypeFamily::Timestamp,
            DataType::Datetime => TypeFamily::Datetime,
            DataType::Set(_) => TypeFamily::Set,
            DataType::Multiset(_) => TypeFamily::Multiset,
            DataType::Sequence(_) => TypeFamily::Sequence,
            DataType::Object(_) => TypeFamily::Object,
        }
    }

    /// Integer types and zero-scale NUMERIC accept AUTO_INCREMENT.
    pub fn supports_auto_increment(&self) -> bool {
        match self {
            DataType::SmallInt | DataType::Integer | DataType::BigInt => true,
            DataType::Numeric { scale, .. } => *scale == 0,
            _ => false,
        }
    }

    /// Returns true for exact integer-valued domains.
    pub fn is_integral(&self) -> bool {
        self.supports_auto_increment()
    }

    pub fn is_character(&self) -> bool {
        matches!(
            self,
            DataType::Char(_) | DataType::Varchar(_) | DataType::NChar(_) | DataType::NVarchar(_)
        )
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            DataType::Set(_) | DataType::Multiset(_) | DataType::Sequence(_)
        )
    }

    /// Compares two domains for inheritance overriding.
    ///
    /// `None` means the domains are incompatible. Otherwise the wider domain
    /// compares `Greater`.
    pub fn compare_domain(&self, other: &DataType) -> Option<Ordering> {
        use DataType::*;

        match (self, other) {
            (SmallInt | Integer | BigInt, SmallInt | Integer | BigInt) => {
                Some(integer_rank(self).cmp(&integer_rank(other)))
            }
            (
                Numeric {
                    precision: p1,
                    scale: s1,
                },
                Numeric {
                    precision: p2,
                    scale: s2,
                },
            ) => (s1 == s2).then(|| p1.cmp(p2)),
            (Float | Double, Float | Double) => {
                let rank = |t: &DataType| u8::from(matches!(t, Double));
                Some(rank(self).cmp(&rank(other)))
            }
            (Char(a), Char(b))
            | (Varchar(a), Varchar(b))
            | (NChar(a), NChar(b))
            | (NVarchar(a), NVarchar(b))
            | (Bit(a), Bit(b))
            | (BitVarying(a), BitVarying(b)) => Some(a.cmp(b)),
            (Set(a), Set(b)) | (Multiset(a), Multiset(b)) | (Sequence(a), Sequence(b)) => {
                a.compare_domain(b)
            }
            (Object(a), Object(b)) => a.eq_ignore_ascii_case(b).then_some(Ordering::Equal),
            _ => (self == other).then_some(Ordering::Equal),
        }
    }
}

fn integer_rank(data_type: &DataType) -> u8 {
    match data_type {
        DataType::SmallInt => 0,
        DataType::Integer => 1,
        _ => 2,
    }
}

fn no_params(name: &str, params: Option<&str>, data_type: DataType) -> Result<DataType, TypeError> {
    match params {
        None => Ok(data_type),
        Some(_) => Err(TypeError::Malformed {
            text: name.to_string(),
        }),
    }
}

fn parse_u32(text: &str, raw: &str) -> Result<u32, TypeError> {
    raw.trim().parse::<u32>().map_err(|_| TypeError::Malformed {
        text: text.to_string(),
    })
}

fn parse_size(text: &str, params: Option<&str>, default: u32) -> Result<u32, TypeError> {
    match params {
        None => Ok(default),
        Some(raw) => parse_u32(text, raw),
    }
}

fn parse_numeric(text: &str, params: Option<&str>) -> Result<DataType, TypeError> {
    let Some(raw) = params else {
        return Ok(DataType::Numeric {
            precision: 15,
            scale: 0,
        });
    };
    let mut parts = raw.split(',');
    let precision = parse_u32(text, parts.next().unwrap_or_default())?;
    let scale = match parts.next() {
        Some(s) => parse_u32(text, s)?,
        None => 0,
    };
    if parts.next().is_some() {
        return Err(TypeError::Malformed {
            text: text.to_string(),
        });
    }
    Ok(DataType::Numeric { precision, scale })
}

fn parse_element(text: &str, params: Option<&str>) -> Result<DataType, TypeError> {
    let raw = params.ok_or_else(|| TypeError::Malformed {
        text: text.to_string(),
    })?;
    let element = DataType::parse(raw)?;
    if element.is_collection() {
        return Err(TypeError::InvalidElement {
            element: element.to_string(),
        });
    }
    Ok(element)
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Numeric { precision, scale } => write!(f, "NUMERIC({},{})", precision, scale),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Monetary => write!(f, "MONETARY"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::NChar(n) => write!(f, "NCHAR({})", n),
            DataType::NVarchar(n) => write!(f, "NCHAR VARYING({})", n),
            DataType::Bit(n) => write!(f, "BIT({})", n),
            DataType::BitVarying(n) => write!(f, "BIT VARYING({})", n),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Datetime => write!(f, "DATETIME"),
            DataType::Set(inner) => write!(f, "SET({})", inner),
            DataType::Multiset(inner) => write!(f, "MULTISET({})", inner),
            DataType::Sequence(inner) => write!(f, "SEQUENCE({})", inner),
            DataType::Object(class) => write!(f, "\"{}\"", class),
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::parse(s)
    }
}

impl TryFrom<String> for DataType {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DataType::parse(&value)
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}
