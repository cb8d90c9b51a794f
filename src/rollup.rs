use serde::Serialize;

mod client_perf;
pub mod quantile;

pub use self::client_perf::ClientPerfStatistics;

// downstream systems key on (name, version); a semantic change to a
// statistic must come with a version bump
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistic {
    pub name: &'static str,
    pub value: f64,
    pub version: i32,
    pub user_submitted: bool,
}

impl Statistic {
    fn new(name: &'static str, value: f64, version: i32) -> Self {
        Self { name, value, version, user_submitted: false }
    }
}
