// Builders for synthetic FTDC streams, shared by the integration tests.
#![allow(dead_code)]

use std::io::Write;

use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, Document};
use flate2::write::ZlibEncoder;
use flate2::Compression;

pub fn put_varint(out: &mut Vec<u8>, value: i64) {
    leb128::write::unsigned(out, value as u64).unwrap();
}

// Column-major delta encoding the way the FTDC writer does it: zero deltas
// collapse into a zero marker plus the count of subsequent zeroes, and a run
// is allowed to continue across a column boundary.
pub fn encode_deltas(columns: &[Vec<i64>]) -> Vec<u8> {
    let flat: Vec<i64> = columns.iter().flatten().copied().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < flat.len() {
        put_varint(&mut out, flat[i]);
        if flat[i] == 0 {
            let mut run = 0usize;
            while i + 1 + run < flat.len() && flat[i + 1 + run] == 0 {
                run += 1;
            }
            put_varint(&mut out, run as i64);
            i += run;
        }
        i += 1;
    }
    out
}

pub fn chunk_payload(
    ref_doc: &Document,
    metric_count: u32,
    delta_count: u32,
    deltas: &[u8],
) -> Vec<u8> {
    let mut payload = Vec::new();
    ref_doc.to_writer(&mut payload).unwrap();
    payload.extend_from_slice(&metric_count.to_le_bytes());
    payload.extend_from_slice(&delta_count.to_le_bytes());
    payload.extend_from_slice(deltas);
    payload
}

pub fn metrics_envelope(payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::from((payload.len() as u32).to_le_bytes());
    let mut encoder = ZlibEncoder::new(&mut data, Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap();

    let envelope = doc! {
        "_id": bson::DateTime::from_millis(0),
        "type": 1i32,
        "data": Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes: data }),
    };
    let mut out = Vec::new();
    envelope.to_writer(&mut out).unwrap();
    out
}

pub fn metrics_envelope_for(
    ref_doc: &Document,
    metric_count: u32,
    deltas_by_column: &[Vec<i64>],
) -> Vec<u8> {
    let delta_count = deltas_by_column.first().map_or(0, Vec::len) as u32;
    let payload = chunk_payload(
        ref_doc,
        metric_count,
        delta_count,
        &encode_deltas(deltas_by_column),
    );
    metrics_envelope(&payload)
}

pub fn metadata_envelope() -> Vec<u8> {
    let envelope = doc! {
        "_id": bson::DateTime::from_millis(0),
        "type": 0i32,
        "doc": { "host": "localhost", "version": "6.0.0" },
    };
    let mut out = Vec::new();
    envelope.to_writer(&mut out).unwrap();
    out
}

pub const BASE_TS_MS: i64 = 1643735930767;
pub const OVERHEAD_NS: i64 = 180009973872;

// cumulative timers.dur deltas of the ten-sample client fixture
pub const DUR_DELTAS: [i64; 10] = [366, 356, 299, 881, 354, 390, 422, 388, 398, 302];

fn cumulative_dur(i: usize) -> i64 {
    DUR_DELTAS[..=i].iter().sum()
}

// The ten-sample client run as decoded sample documents: cumulative counters,
// 1 ms sampling cadence, one operation and two size units per sample.
pub fn ten_sample_docs() -> Vec<Document> {
    (0..10)
        .map(|i| {
            let dur = cumulative_dur(i);
            doc! {
                "ts": bson::DateTime::from_millis(BASE_TS_MS + i as i64),
                "id": i as i64,
                "counters": {
                    "n": (i + 1) as i64,
                    "ops": (i + 1) as i64,
                    "size": 2 * i as i64,
                    "errors": 0i64,
                },
                "timers": { "dur": dur, "total": OVERHEAD_NS + dur },
                "gauges": { "state": 0i64, "workers": 1i64, "failed": false },
            }
        })
        .collect()
}

pub fn ten_sample_stream() -> Vec<u8> {
    let ref_doc = ten_sample_docs().remove(0);
    let step = |deltas: &[i64]| deltas.to_vec();
    let dur_deltas: Vec<i64> = DUR_DELTAS[1..].to_vec();
    let columns = vec![
        step(&[1; 9]),       // ts
        step(&[1; 9]),       // id
        step(&[1; 9]),       // counters.n
        step(&[1; 9]),       // counters.ops
        step(&[2; 9]),       // counters.size
        step(&[0; 9]),       // counters.errors
        dur_deltas.clone(),  // timers.dur
        dur_deltas,          // timers.total
        step(&[0; 9]),       // gauges.state
        step(&[0; 9]),       // gauges.workers
        step(&[0; 9]),       // gauges.failed
    ];
    metrics_envelope_for(&ref_doc, 11, &columns)
}
