// Plotting-position quantile estimation: the quantile at probability p is a
// linear blend of the two order statistics bracketing the position
// n*p + alphap + p*(1 - alphap - betap). A single-element slice is its own
// quantile at every probability; an empty slice yields zeroes.
pub fn mquantiles(data: &[f64], probs: &[f64], alphap: f64, betap: f64) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    probs
        .iter()
        .map(|&p| quantile_of_sorted(&sorted, p, alphap, betap))
        .collect()
}

fn quantile_of_sorted(sorted: &[f64], p: f64, alphap: f64, betap: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        1 => sorted[0],
        _ => {
            let m = alphap + p * (1.0 - alphap - betap);
            let aleph = n as f64 * p + m;
            let k = aleph.clamp(1.0, (n - 1) as f64).floor();
            let gamma = (aleph - k).clamp(0.0, 1.0);
            let k = k as usize;
            (1.0 - gamma) * sorted[k - 1] + gamma * sorted[k]
        }
    }
}
