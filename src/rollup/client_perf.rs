use bson::{Bson, Document};

use crate::ftdc::{Error, Result, Sample};
use crate::metric::{unix_millis_to_timestamp, Timestamp};

use super::quantile::mquantiles;
use super::Statistic;

const TO_NANOSECONDS: f64 = 1e9;
const LATENCY_PROBS: [f64; 5] = [0.5, 0.8, 0.9, 0.95, 0.99];
const PLOTTING_ALPHAP: f64 = 1.0 / 3.0;
const PLOTTING_BETAP: f64 = 1.0 / 3.0;

#[derive(Debug, Default)]
pub struct ClientPerfStatistics {
    operations_total: i64,
    documents_total: i64,
    size_total: i64,
    errors_total: i64,
    duration_total: i64,
    timers_total: i64,
    workers_min: i64,
    workers_max: i64,
    min_duration: f64,
    max_duration: f64,
    previous_duration: f64,
    extracted_durations: Vec<f64>,
    first_ts: Option<Timestamp>,
    last_ts: Option<Timestamp>,
}

impl ClientPerfStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, sample: &Sample) -> Result<()> {
        let result = self.try_add(sample);
        if result.is_err() {
            *self = Self::default();
        }
        result
    }

    fn try_add(&mut self, sample: &Sample) -> Result<()> {
        let ts = ts_field(sample, "ts")?;
        let counters = subdoc(sample, "counters")?;
        let documents = int_field(counters, "n")?;
        let operations = int_field(counters, "ops")?;
        let size = int_field(counters, "size")?;
        let errors = int_field(counters, "errors")?;
        let timers = subdoc(sample, "timers")?;
        // producers disagree on the spelling; `dur` is the newer one
        let duration = int_field(timers, "dur")
            .or_else(|_| int_field(timers, "duration"))
            .map_err(|_| Error::MissingField("duration"))?;
        let timers_total = int_field(timers, "total")?;
        let gauges = subdoc(sample, "gauges")?;
        let workers = int_field(gauges, "workers")?;

        let extracted = duration as f64 - self.previous_duration;
        if self.first_ts.is_none() {
            self.first_ts = Some(ts);
            self.min_duration = extracted;
            self.max_duration = extracted;
        } else {
            self.min_duration = self.min_duration.min(extracted);
            self.max_duration = self.max_duration.max(extracted);
        }
        self.previous_duration = duration as f64;
        self.last_ts = Some(ts);
        self.extracted_durations.push(extracted);

        // upstream updates both worker bounds with a min; reproduced because
        // consumers pin the published values at these versions
        self.workers_min = self.workers_min.min(workers);
        self.workers_max = self.workers_max.min(workers);

        self.operations_total = operations;
        self.documents_total = documents;
        self.size_total = size;
        self.errors_total = errors;
        self.duration_total = duration;
        self.timers_total = timers_total;
        Ok(())
    }

    pub fn all_statistics(&self) -> Vec<Statistic> {
        let mut statistics = vec![
            self.average_latency(),
            self.average_size(),
            self.operation_throughput(),
            self.document_throughput(),
            self.error_rate(),
            self.size_throughput(),
            self.workers_min(),
            self.workers_max(),
            self.latency_min(),
            self.latency_max(),
            self.duration_total(),
            self.errors_total(),
            self.operations_total(),
            self.documents_total(),
            self.size_total(),
            self.overhead_total(),
        ];
        statistics.extend(self.latency_quantiles());
        statistics
    }

    pub fn average_latency(&self) -> Statistic {
        let value = if self.operations_total > 0 {
            self.duration_total as f64 / self.operations_total as f64
        } else {
            0.0
        };
        Statistic::new("AverageLatency", value, 3)
    }

    pub fn average_size(&self) -> Statistic {
        let value = if self.operations_total > 0 {
            self.size_total as f64 / self.operations_total as f64
        } else {
            0.0
        };
        Statistic::new("AverageSize", value, 3)
    }

    pub fn operation_throughput(&self) -> Statistic {
        Statistic::new("OperationThroughput", self.per_wall_second(self.operations_total), 4)
    }

    pub fn document_throughput(&self) -> Statistic {
        Statistic::new("DocumentThroughput", self.per_wall_second(self.documents_total), 0)
    }

    pub fn error_rate(&self) -> Statistic {
        Statistic::new("ErrorRate", self.per_wall_second(self.errors_total), 4)
    }

    pub fn size_throughput(&self) -> Statistic {
        Statistic::new("SizeThroughput", self.per_wall_second(self.size_total), 4)
    }

    pub fn workers_min(&self) -> Statistic {
        Statistic::new("WorkersMin", self.workers_min as f64, 3)
    }

    pub fn workers_max(&self) -> Statistic {
        Statistic::new("WorkersMax", self.workers_max as f64, 3)
    }

    pub fn latency_min(&self) -> Statistic {
        let value = if self.extracted_durations.is_empty() { 0.0 } else { self.min_duration };
        Statistic::new("LatencyMin", value, 4)
    }

    pub fn latency_max(&self) -> Statistic {
        let value = if self.extracted_durations.is_empty() { 0.0 } else { self.max_duration };
        Statistic::new("LatencyMax", value, 4)
    }

    pub fn duration_total(&self) -> Statistic {
        // wall time rather than the sum of per-sample durations, to stay
        // consistent with what legacy Cedar rollups published
        Statistic::new("DurationTotal", self.wall_time_secs() * TO_NANOSECONDS, 4)
    }

    pub fn errors_total(&self) -> Statistic {
        Statistic::new("ErrorsTotal", self.errors_total as f64, 3)
    }

    pub fn operations_total(&self) -> Statistic {
        Statistic::new("OperationsTotal", self.operations_total as f64, 3)
    }

    pub fn documents_total(&self) -> Statistic {
        Statistic::new("DocumentsTotal", self.documents_total as f64, 0)
    }

    pub fn size_total(&self) -> Statistic {
        Statistic::new("SizeTotal", self.size_total as f64, 3)
    }

    pub fn overhead_total(&self) -> Statistic {
        Statistic::new("OverheadTotal", (self.timers_total - self.duration_total) as f64, 1)
    }

    pub fn latency_quantiles(&self) -> Vec<Statistic> {
        const NAMES: [&str; 5] = [
            "Latency50thPercentile",
            "Latency80thPercentile",
            "Latency90thPercentile",
            "Latency95thPercentile",
            "Latency99thPercentile",
        ];
        let values = if self.extracted_durations.is_empty() {
            vec![0.0; NAMES.len()]
        } else {
            mquantiles(
                &self.extracted_durations,
                &LATENCY_PROBS,
                PLOTTING_ALPHAP,
                PLOTTING_BETAP,
            )
        };
        NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| Statistic::new(name, value, 4))
            .collect()
    }

    fn wall_time_secs(&self) -> f64 {
        match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    fn per_wall_second(&self, total: i64) -> f64 {
        let wall_time = self.wall_time_secs();
        if wall_time > 0.0 {
            total as f64 / wall_time
        } else {
            total as f64
        }
    }
}

fn subdoc<'d>(doc: &'d Document, name: &'static str) -> Result<&'d Document> {
    match doc.get(name) {
        Some(Bson::Document(doc)) => Ok(doc),
        _ => Err(Error::MissingField(name)),
    }
}

fn int_field(doc: &Document, name: &'static str) -> Result<i64> {
    doc.get(name)
        .and_then(coerce_int)
        .ok_or(Error::MissingField(name))
}

fn ts_field(doc: &Document, name: &'static str) -> Result<Timestamp> {
    match doc.get(name) {
        Some(Bson::DateTime(value)) => Ok(unix_millis_to_timestamp(value.timestamp_millis())),
        _ => Err(Error::MissingField(name)),
    }
}

// older producers stored some totals as doubles; truncate like the decoder
// does for reference-document leaves
fn coerce_int(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int64(value) => Some(*value),
        Bson::Int32(value) => Some(*value as i64),
        Bson::Double(value) => Some(*value as i64),
        Bson::Boolean(value) => Some(i64::from(*value)),
        _ => None,
    }
}
