/// Error type for data type parsing and limit checks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("malformed type '{text}'")]
    Malformed { text: String },

    #[error("type {type_name} requires a size")]
    MissingSize { type_name: String },

    #[error("size {size} of {type_name} must be between {min} and {max}")]
    InvalidSize {
        type_name: String,
        size: u32,
        min: u32,
        max: u32,
    },

    #[error("precision {precision} must be between 1 and {max}")]
    InvalidPrecision { precision: u32, max: u32 },

    #[error("scale {scale} must not exceed precision {precision}")]
    ScaleExceedsPrecision { scale: u32, precision: u32 },

    #[error("collection element type {element} is not allowed")]
    InvalidElement { element: String },
}
