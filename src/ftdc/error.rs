use bson::document::ValueAccessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input ended in the middle of a structure")]
    Truncated,

    #[error("declared document length {declared} inconsistent with {available} available bytes")]
    BadLength { declared: usize, available: usize },

    #[error("chunk declares {declared} metrics but the reference document has {found}")]
    SchemaMismatch { declared: usize, found: usize },

    #[error("{0} bytes left in the metrics payload after the last delta")]
    TrailingBytes(usize),

    #[error("document of {len} bytes exceeds the {limit}-byte frame budget")]
    OverBudget { len: usize, limit: usize },

    #[error("sample is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("error inflating metrics payload")]
    DecompressionFailed(#[source] std::io::Error),

    #[error("varint does not fit in 64 bits")]
    VarintOverflow,

    #[error("error reading the FTDC stream")]
    Io(#[from] std::io::Error),

    #[error("error parsing BSON")]
    Bson(#[from] bson::de::Error),

    #[error("error extracting FTDC data from BSON")]
    InvalidDocumentFormat(#[from] ValueAccessError),
}

impl From<leb128::read::Error> for Error {
    fn from(err: leb128::read::Error) -> Self {
        match err {
            leb128::read::Error::IoError(err) => {
                if err.kind() == std::io::ErrorKind::UnexpectedEof {
                    Self::Truncated
                } else {
                    Self::Io(err)
                }
            }
            leb128::read::Error::Overflow => Self::VarintOverflow,
        }
    }
}
