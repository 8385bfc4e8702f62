//! Column domains, their limits, and literal formatting.

mod data_type;
mod error;
mod type_table;
mod value;

pub use data_type::{
    DataType, TypeFamily, MAX_CHAR_SIZE, MAX_NCHAR_SIZE, MAX_NUMERIC_PRECISION,
};
pub use error::TypeError;
pub use type_table::{TypeLimits, TypeTable};
pub use value::parse_integer;

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
