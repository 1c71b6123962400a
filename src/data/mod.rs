pub mod decoder;
pub mod geojson;
pub mod population;
pub mod region;
pub mod topojson;

pub use decoder::{
    decoder_for, BoundaryDecoder, BoundaryFormat, FlatDecoder, KeyProperty, TopologyDecoder,
};
pub use population::{Domain, PopulationDataset, PopulationDecoder};
pub use region::{BoundaryDataset, Region, RegionGeometry};

/// Errors raised while turning raw documents into regions or population tables
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed document: {0}")]
    InvalidJson(String),

    #[error("expected a {expected} document, found '{found}'")]
    UnexpectedType {
        expected: &'static str,
        found: String,
    },

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("arc reference {0} is out of range")]
    ArcIndexOutOfRange(i64),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::InvalidJson(err.to_string())
    }
}
