//! Read-only limits for every domain family.

use std::collections::HashMap;

use super::data_type::{
    DataType, TypeFamily, MAX_CHAR_SIZE, MAX_NCHAR_SIZE, MAX_NUMERIC_PRECISION,
};
use super::error::TypeError;
use crate::error::SchemaError;

/// Limits of a single domain family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLimits {
    /// Smallest storable integer value, for integral families
    pub min_value: Option<i128>,
    /// Largest storable integer value, for integral families
    pub max_value: Option<i128>,
    /// Whether the domain carries a size parameter
    pub needs_size: bool,
    /// Whether the domain carries precision and scale
    pub needs_precision: bool,
    /// Largest legal size or precision
    pub max_size: Option<u32>,
}

impl TypeLimits {
    fn plain() -> Self {
        Self {
            min_value: None,
            max_value: None,
            needs_size: false,
            needs_precision: false,
            max_size: None,
        }
    }

    fn integral(min: i128, max: i128) -> Self {
        Self {
            min_value: Some(min),
            max_value: Some(max),
            ..Self::plain()
        }
    }

    fn sized(max_size: u32) -> Self {
        Self {
            needs_size: true,
            max_size: Some(max_size),
            ..Self::plain()
        }
    }
}

/// Lookup table from domain family to its limits.
///
/// Built once and only read afterwards; it travels inside the planner
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTable {
    limits: HashMap<TypeFamily, TypeLimits>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::cubrid()
    }
}

impl TypeTable {
    /// Creates the table of CUBRID domain limits.
    pub fn cubrid() -> Self {
        let mut limits = HashMap::new();
        limits.insert(
            TypeFamily::SmallInt,
            TypeLimits::integral(i16::MIN as i128, i16::MAX as i128),
        );
        limits.insert(
            TypeFamily::Integer,
            TypeLimits::integral(i32::MIN as i128, i32::MAX as i128),
        );
        limits.insert(
            TypeFamily::BigInt,
            TypeLimits::integral(i64::MIN as i128, i64::MAX as i128),
        );
        limits.insert(
            TypeFamily::Numeric,
            TypeLimits {
                needs_precision: true,
                max_size: Some(MAX_NUMERIC_PRECISION),
                ..TypeLimits::plain()
            },
        );
        for family in [
            TypeFamily::Char,
            TypeFamily::Varchar,
            TypeFamily::Bit,
            TypeFamily::BitVarying,
        ] {
            limits.insert(family, TypeLimits::sized(MAX_CHAR_SIZE));
        }
        for family in [TypeFamily::NChar, TypeFamily::NVarchar] {
            limits.insert(family, TypeLimits::sized(MAX_NCHAR_SIZE));
        }
        for family in [
            TypeFamily::Float,
            TypeFamily::Double,
            TypeFamily::Monetary,
            TypeFamily::Date,
            TypeFamily::Time,
            TypeFamily::Timestamp,
            TypeFamily::Datetime,
            TypeFamily::Set,
            TypeFamily::Multiset,
            TypeFamily::Sequence,
            TypeFamily::Object,
        ] {
            limits.insert(family, TypeLimits::plain());
        }
        Self { limits }
    }

    /// Returns the limits of a family.
    pub fn limits(&self, family: TypeFamily) -> Option<&TypeLimits> {
        self.limits.get(&family)
    }

    /// Checks size, precision and scale of a domain against the table.
    ///
    /// # Arguments
    /// * `data_type` - Domain to check
    ///
    /// # Returns
    /// `Result<(), TypeError>` with the first violated limit.
    pub fn validate_type(&self, data_type: &DataType) -> Result<(), TypeError> {
        let Some(limits) = self.limits(data_type.family()) else {
            return Err(TypeError::UnknownType {
                name: data_type.to_string(),
            });
        };

        match data_type {
            DataType::Char(size)
            | DataType::Varchar(size)
            | DataType::NChar(size)
            | DataType::NVarchar(size)
            | DataType::Bit(size)
            | DataType::BitVarying(size) => {
                let max = limits.max_size.unwrap_or(u32::MAX);
                if *size < 1 || *size > max {
                    return Err(TypeError::InvalidSize {
                        type_name: type_name(data_type),
                        size: *size,
                        min: 1,
                        max,
                    });
                }
                Ok(())
            }
            DataType::Numeric { precision, scale } => {
                let max = limits.max_size.unwrap_or(MAX_NUMERIC_PRECISION);
                if *precision < 1 || *precision > max {
                    return Err(TypeError::InvalidPrecision {
                        precision: *precision,
                        max,
                    });
                }
                if scale > precision {
                    return Err(TypeError::ScaleExceedsPrecision {
                        scale: *scale,
                        precision: *precision,
                    });
                }
                Ok(())
            }
            DataType::Set(element) | DataType::Multiset(element) | DataType::Sequence(element) => {
                self.validate_type(element)
            }
            _ => Ok(()),
        }
    }

    /// Returns the inclusive integer range of an integral domain.
    pub fn value_range(&self, data_type: &DataType) -> Option<(i128, i128)> {
        match data_type {
            DataType::Numeric {
                precision,
                scale: 0,
            } => {
                let max = 10i128.checked_pow(*precision)?.checked_sub(1)?;
                Some((-max, max))
            }
            _ => {
                let limits = self.limits(data_type.family())?;
                Some((limits.min_value?, limits.max_value?))
            }
        }
    }

    /// Checks an integer value against the domain's range.
    ///
    /// Domains without an integer range accept any value.
    pub fn check_range(&self, data_type: &DataType, value: i128) -> Result<(), SchemaError> {
        match self.value_range(data_type) {
            Some((min, max)) if value < min || value > max => Err(SchemaError::ValueOutOfRange {
                data_type: data_type.to_string(),
                value: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn type_name(data_type: &DataType) -> String {
    let text = data_type.to_string();
    match text.find('(') {
        Some(open) => text[..open].to_string(),
        None => text,
    }
}
