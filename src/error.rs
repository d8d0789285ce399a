use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("nbt error: {0}")]
    Nbt(#[from] fastnbt::error::Error),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("snbt parse error at byte {offset}: {message}")]
    Snbt { offset: usize, message: String },

    #[error("{0} is an invalid blockstate representation")]
    InvalidBlockState(String),

    #[error("unable to parse minecraft version '{0}'")]
    UnknownVersion(String),

    #[error("unrecognized schematic payload")]
    UnknownFormat,

    #[error("palette index {index} out of range (palette has {len} entries)")]
    PaletteIndex { index: usize, len: usize },

    #[error("{axis} axis too big, {value} > {max}")]
    SizeLimit {
        axis: &'static str,
        value: i64,
        max: i64,
    },

    #[error("total schematic volume too big, {volume} > {max}")]
    VolumeLimit { volume: i64, max: i64 },

    #[error("too many regions in source schematic ({0})")]
    TooManyRegions(usize),

    #[error("{0} is not supported")]
    Unsupported(&'static str),

    #[error("unexpected format: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, SchemError>;
