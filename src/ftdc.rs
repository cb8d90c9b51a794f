use std::io::{Cursor, Read};

use bson::document::ValueAccessError;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document};
use flate2::bufread::ZlibDecoder;
use lebe::io::ReadEndian;

mod chunk;
mod error;
mod stream;
mod varint;

pub use self::chunk::ChunkSamples;
pub use self::error::Error;
pub use self::stream::{decode_iter, decode_reader, Poll, ReaderSamples, SampleIter, StreamDecoder};

pub type Result<T> = std::result::Result<T, Error>;

pub type Sample = Document;

const METRICS_CHUNK_TYPE: i32 = 1;

fn is_metrics_envelope(doc: &Document) -> bool {
    matches!(doc.get_i32("type"), Ok(METRICS_CHUNK_TYPE))
}

pub fn decode_chunk(mut doc: Document) -> Result<ChunkSamples> {
    let compressed = match doc.remove("data") {
        Some(Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes })) => bytes,
        Some(_) => {
            return Err(Error::InvalidDocumentFormat(
                ValueAccessError::UnexpectedType,
            ))
        }
        None => return Err(Error::InvalidDocumentFormat(ValueAccessError::NotPresent)),
    };
    if compressed.len() < 4 {
        return Err(Error::Truncated);
    }

    // the leading uncompressed-length word is advisory; use it only as a capacity hint
    let uncompressed_len: u32 = Cursor::new(compressed.as_slice()).read_from_little_endian()?;
    let mut payload = Vec::with_capacity(uncompressed_len as usize);
    ZlibDecoder::new(&compressed[4..])
        .read_to_end(&mut payload)
        .map_err(Error::DecompressionFailed)?;

    chunk::decode_payload(&payload)
}
