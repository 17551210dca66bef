//! Synthetic demographic inputs: an age pyramid and a mortality table.

use anyhow::Result;

use epi_core::{DAYS_PER_YEAR, SimRng};
use epi_sampling::AliasedDistribution;

/// Years per age band in [`AGE_PYRAMID`].
pub const BAND_YEARS: u64 = 5;

/// People per 100,000 in each five-year band, 0–4 through 95–99.
pub const AGE_PYRAMID: [u64; 20] = [
    6_100, 6_300, 6_500, 6_400, 6_600, 6_900, 7_000, 6_800, 6_400, 6_200,
    6_300, 6_400, 6_300, 5_700, 4_600, 3_500, 2_300, 1_400, 800, 300,
];

/// Cumulative deaths per 100,000 births by the end of each year of age
/// 0..=100, from a Gompertz hazard `h(a) = A·e^(B·a)`.  Nobody outlives the
/// table.
pub fn cumulative_deaths() -> Vec<u64> {
    const COHORT: f64 = 100_000.0;
    const A: f64 = 5e-5;
    const B: f64 = 0.09;

    let mut deaths: Vec<u64> = (0..=100)
        .map(|age| {
            let hazard = A / B * ((B * (age as f64 + 1.0)).exp() - 1.0);
            (COHORT * -(-hazard).exp_m1()).round() as u64
        })
        .collect();
    if let Some(last) = deaths.last_mut() {
        *last = COHORT as u64;
    }
    deaths
}

/// Current ages in days for `n` agents drawn from [`AGE_PYRAMID`].
pub fn sample_ages(n: usize, rng: &mut SimRng) -> Result<Vec<u64>> {
    let pyramid = AliasedDistribution::from_counts(&AGE_PYRAMID)?;
    let mut bands = vec![0usize; n];
    pyramid.par_sample_into(&mut bands, rng);

    let band_days = BAND_YEARS * DAYS_PER_YEAR;
    Ok(bands
        .into_iter()
        .map(|band| band as u64 * band_days + rng.gen_range(0..band_days))
        .collect())
}
