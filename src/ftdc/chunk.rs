use std::io::{Cursor, Read, Seek, SeekFrom};

use bson::{Bson, Document};
use lebe::io::ReadEndian;
use tracing::trace;

use crate::metric::{LeafKind, MetricKey};

use super::{varint, Error, Result, Sample};

// A BSON document is at least a length word plus the trailing NUL.
const MIN_DOCUMENT_LEN: usize = 5;

struct MetricColumn {
    key: MetricKey,
    kind: LeafKind,
    values: Vec<i64>,
}

pub(super) fn decode_payload(payload: &[u8]) -> Result<ChunkSamples> {
    if payload.len() < 4 {
        return Err(Error::Truncated);
    }
    let mut cursor = Cursor::new(payload);
    let doc_len: u32 = cursor.read_from_little_endian()?;
    let doc_len = doc_len as usize;
    if doc_len > payload.len() || doc_len < MIN_DOCUMENT_LEN {
        return Err(Error::BadLength { declared: doc_len, available: payload.len() });
    }
    let ref_doc = Document::from_reader(&payload[..doc_len])?;
    cursor.seek(SeekFrom::Start(doc_len as u64))?;

    let metric_count = read_u32(&mut cursor)? as usize;
    let delta_count = read_u32(&mut cursor)? as usize;

    let mut decoder = ColumnDecoder::new(metric_count, delta_count);
    decoder.collect_metrics(&ref_doc);
    if decoder.columns.len() != metric_count {
        return Err(Error::SchemaMismatch { declared: metric_count, found: decoder.columns.len() });
    }
    if metric_count == 0 {
        // degenerate but valid: nothing to yield, even if delta_count > 0
        return Ok(ChunkSamples::empty());
    }

    decoder.decode_deltas(&mut cursor)?;
    let leftover = payload.len() - cursor.position() as usize;
    if leftover > 0 {
        return Err(Error::TrailingBytes(leftover));
    }

    Ok(decoder.finish())
}

struct ColumnDecoder {
    num_deltas: usize,
    columns: Vec<MetricColumn>,
}

impl ColumnDecoder {
    fn new(num_keys: usize, num_deltas: usize) -> Self {
        Self { num_deltas, columns: Vec::with_capacity(num_keys) }
    }

    fn collect_metrics(&mut self, doc: &Document) {
        let mut prefix = MetricKey::new();
        self.collect_children(&mut prefix, doc.iter());
    }

    fn decode_deltas<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        // the zero-run counter survives the column boundary: a run emitted
        // partway through one column continues into the next
        let mut zeroes_pending: u64 = 0;
        for column in self.columns.iter_mut() {
            let mut value = column.values[0];
            for _ in 0..self.num_deltas {
                let delta = if zeroes_pending > 0 {
                    zeroes_pending -= 1;
                    0
                } else {
                    let delta = varint::read(reader)?;
                    if delta == 0 {
                        // the run length counts the zero deltas that follow
                        // this one, not the current one
                        zeroes_pending = varint::read(reader)? as u64;
                    }
                    delta
                };
                value = value.wrapping_add(delta);
                column.values.push(value);
            }
        }
        Ok(())
    }

    fn finish(self) -> ChunkSamples {
        ChunkSamples {
            num_samples: self.num_deltas + 1,
            columns: self.columns,
            idx: 0,
        }
    }

    fn collect_element(&mut self, elem: &Bson, prefix: &mut MetricKey) {
        match elem {
            Bson::Document(doc) => self.collect_children(prefix, doc.iter()),
            Bson::Array(array) => self.collect_children(
                prefix,
                array
                    .iter()
                    .enumerate()
                    .map(|(idx, elem)| (idx.to_string(), elem)),
            ),
            Bson::DateTime(value) => {
                self.add_column(prefix, LeafKind::DateTime, value.timestamp_millis())
            }
            Bson::Int64(value) => self.add_column(prefix, LeafKind::Int64, *value),
            Bson::Int32(value) => self.add_column(prefix, LeafKind::Int64, *value as i64),
            Bson::Double(value) => self.add_column(prefix, LeafKind::Int64, *value as i64),
            Bson::Boolean(value) => self.add_column(prefix, LeafKind::Bool, i64::from(*value)),
            other => trace!(
                key = ?prefix,
                kind = ?other.element_type(),
                "ignoring non-metric field",
            ),
        }
    }

    fn collect_children<'e, K: AsRef<str>, I: IntoIterator<Item = (K, &'e Bson)>>(
        &mut self,
        prefix: &mut MetricKey,
        children: I,
    ) {
        let prefix_len = prefix.len();
        for (key, elem) in children {
            prefix.push(key.as_ref());
            self.collect_element(elem, prefix);
            prefix.truncate(prefix_len);
        }
    }

    fn add_column(&mut self, key: &MetricKey, kind: LeafKind, init_val: i64) {
        let mut values = Vec::with_capacity(self.num_deltas + 1);
        values.push(init_val);

        self.columns.push(MetricColumn { key: key.clone(), kind, values });
    }
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    match reader.read_from_little_endian() {
        Ok(value) => Ok(value),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Err(Error::Truncated)
            } else {
                Err(Error::Io(err))
            }
        }
    }
}

pub struct ChunkSamples {
    columns: Vec<MetricColumn>,
    num_samples: usize,
    idx: usize,
}

impl ChunkSamples {
    fn empty() -> Self {
        Self { columns: vec![], num_samples: 0, idx: 0 }
    }
}

impl Iterator for ChunkSamples {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.idx >= self.num_samples {
            return None;
        }
        let idx = self.idx;
        self.idx += 1;

        let mut doc = Document::new();
        for column in &self.columns {
            insert_leaf(&mut doc, &column.key, column.kind.to_bson(column.values[idx]));
        }
        Some(doc)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_samples - self.idx;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkSamples {}

fn insert_leaf(doc: &mut Document, key: &MetricKey, value: Bson) {
    let mut cur = doc;
    let mut segments = key.iter().peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            cur.insert(segment, value);
            return;
        }
        if !matches!(cur.get(segment), Some(Bson::Document(_))) {
            cur.insert(segment, Document::new());
        }
        cur = cur
            .get_mut(segment)
            .and_then(Bson::as_document_mut)
            .expect("segment was just set to a document");
    }
}
