use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("missing column '{0}' in input header")]
    MissingColumn(String),

    #[error("delimiter '{0}' is not a single ASCII character")]
    InvalidDelimiter(char),

    #[error("row {row}: unparseable timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: invalid {column} '{value}'")]
    InvalidCoordinate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[cfg(feature = "landcover")]
    #[error("{0}")]
    GeoJson(#[from] geojson::Error),

    #[cfg(feature = "landcover")]
    #[error("no usable polygons in land-cover layer {0}")]
    EmptyLandCover(String),
}
