pub mod ftdc;
pub mod metric;
pub mod rollup;

pub use self::ftdc::{
    decode_chunk, decode_iter, decode_reader, ChunkSamples, Error, Poll, ReaderSamples, Result,
    Sample, SampleIter, StreamDecoder,
};
pub use self::metric::{unix_millis_to_timestamp, LeafKind, MetricKey, Timestamp};
pub use self::rollup::{ClientPerfStatistics, Statistic};
