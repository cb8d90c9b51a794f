use std::io::Read;

use bson::Document;
use lebe::io::ReadEndian;
use tracing::debug;

use super::chunk::ChunkSamples;
use super::{decode_chunk, is_metrics_envelope, Error, Result, Sample};

#[derive(Debug)]
pub enum Poll {
    Sample(Sample),
    NeedMore,
    End,
}

#[derive(Debug, Clone, Copy)]
enum MemoryBound {
    Unbounded,
    // settles to Fixed(5 * len) on the first observed document length
    Auto,
    Fixed(usize),
}

pub struct StreamDecoder {
    frame: Vec<u8>,
    bound: MemoryBound,
    finished: bool,
    samples: Option<ChunkSamples>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::with_bound(MemoryBound::Auto)
    }

    pub fn with_memory_limit(limit: usize) -> Self {
        Self::with_bound(MemoryBound::Fixed(limit))
    }

    pub(super) fn unbounded() -> Self {
        Self::with_bound(MemoryBound::Unbounded)
    }

    fn with_bound(bound: MemoryBound) -> Self {
        Self { frame: Vec::new(), bound, finished: false, samples: None }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.frame.extend_from_slice(bytes);
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn next_sample(&mut self) -> Result<Poll> {
        loop {
            if let Some(samples) = &mut self.samples {
                match samples.next() {
                    Some(sample) => return Ok(Poll::Sample(sample)),
                    None => self.samples = None,
                }
            }

            if self.frame.len() < 4 {
                return self.starved();
            }
            let doc_len: u32 = self.frame.as_slice().read_from_little_endian()?;
            let doc_len = doc_len as usize;
            if doc_len < MIN_ENVELOPE_LEN {
                return Err(Error::BadLength { declared: doc_len, available: self.frame.len() });
            }
            if let MemoryBound::Auto = self.bound {
                self.bound = MemoryBound::Fixed(5 * doc_len);
            }
            if let MemoryBound::Fixed(limit) = self.bound {
                if doc_len > limit {
                    return Err(Error::OverBudget { len: doc_len, limit });
                }
            }
            if self.frame.len() < doc_len {
                return self.starved();
            }

            let envelope = Document::from_reader(&self.frame[..doc_len])?;
            self.frame.drain(..doc_len);

            if is_metrics_envelope(&envelope) {
                self.samples = Some(decode_chunk(envelope)?);
            } else {
                debug!(envelope_type = ?envelope.get("type"), "skipping non-metrics envelope");
            }
        }
    }

    fn starved(&self) -> Result<Poll> {
        if !self.finished {
            Ok(Poll::NeedMore)
        } else if self.frame.is_empty() {
            Ok(Poll::End)
        } else {
            Err(Error::Truncated)
        }
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

const MIN_ENVELOPE_LEN: usize = 5;

pub fn decode_iter(bytes: &[u8]) -> SampleIter {
    let mut decoder = StreamDecoder::unbounded();
    decoder.feed(bytes);
    decoder.finish();
    SampleIter { decoder, failed: false }
}

pub struct SampleIter {
    decoder: StreamDecoder,
    failed: bool,
}

impl Iterator for SampleIter {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.decoder.next_sample() {
            Ok(Poll::Sample(sample)) => Some(Ok(sample)),
            // a finished decoder never reports NeedMore
            Ok(Poll::NeedMore) | Ok(Poll::End) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

pub fn decode_reader<R: Read>(reader: R) -> ReaderSamples<R> {
    ReaderSamples { reader, decoder: StreamDecoder::new(), failed: false }
}

const READ_CHUNK_LEN: usize = 8192;

pub struct ReaderSamples<R> {
    reader: R,
    decoder: StreamDecoder,
    failed: bool,
}

impl<R: Read> Iterator for ReaderSamples<R> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.decoder.next_sample() {
                Ok(Poll::Sample(sample)) => return Some(Ok(sample)),
                Ok(Poll::End) => return None,
                Ok(Poll::NeedMore) => {
                    let mut buf = [0u8; READ_CHUNK_LEN];
                    match self.reader.read(&mut buf) {
                        Ok(0) => self.decoder.finish(),
                        Ok(n) => self.decoder.feed(&buf[..n]),
                        Err(err) => {
                            self.failed = true;
                            return Some(Err(err.into()));
                        }
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
