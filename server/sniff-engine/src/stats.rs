//! Streaming statistics: windowed Welford mean/variance and small slice helpers.

use serde::{Deserialize, Serialize};

/// Online mean/variance (Welford) that also supports removing a previously
/// pushed sample, so it can track a sliding window without rescanning it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
  count: u64,
  mean: f64,
  /// Sum of squared deviations from the mean.
  m2: f64,
}

impl RunningStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn count(&self) -> u64 {
    self.count
  }

  pub fn mean(&self) -> f64 {
    self.mean
  }

  pub fn push(&mut self, x: f64) {
    self.count += 1;
    let delta = x - self.mean;
    self.mean += delta / self.count as f64;
    self.m2 += delta * (x - self.mean);
  }

  /// Undo a `push(x)`. The caller guarantees `x` is currently in the sample.
  pub fn remove(&mut self, x: f64) {
    match self.count {
      0 => {}
      1 => *self = Self::default(),
      n => {
        let remaining = (n - 1) as f64;
        let mean_without = (self.mean * n as f64 - x) / remaining;
        self.m2 -= (x - self.mean) * (x - mean_without);
        self.mean = mean_without;
        self.count = n - 1;
        // Cancellation can leave a tiny negative residue.
        if self.m2 < 0.0 {
          self.m2 = 0.0;
        }
      }
    }
  }

  /// Sample variance; `None` with fewer than two samples.
  pub fn variance(&self) -> Option<f64> {
    if self.count < 2 {
      return None;
    }
    Some((self.m2 / (self.count - 1) as f64).max(0.0))
  }

  pub fn stddev(&self) -> Option<f64> {
    self.variance().map(f64::sqrt)
  }
}

pub fn mean(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 with fewer than two values.
pub fn stddev(values: &[f64]) -> f64 {
  if values.len() < 2 {
    return 0.0;
  }
  let m = mean(values);
  let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
  (ss / (values.len() - 1) as f64).sqrt()
}

/// Population variance; 0 for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let m = mean(values);
  values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// stddev / mean; 0 when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
  let m = mean(values);
  if m <= 0.0 {
    return 0.0;
  }
  stddev(values) / m
}

#[cfg(test)]
mod tests {
  use super::*;

  fn naive_sample_variance(values: &[f64]) -> f64 {
    stddev(values).powi(2)
  }

  #[test]
  fn variance_needs_two_samples() {
    let mut s = RunningStats::new();
    assert!(s.variance().is_none());
    s.push(10.0);
    assert!(s.variance().is_none());
    s.push(20.0);
    assert!((s.variance().unwrap() - 50.0).abs() < 1e-9);
  }

  #[test]
  fn matches_naive_computation() {
    let values = [40.0, 50.0, 60.0];
    let mut s = RunningStats::new();
    for v in values {
      s.push(v);
    }
    assert!((s.mean() - 50.0).abs() < 1e-9);
    assert!((s.stddev().unwrap() - 10.0).abs() < 1e-9);
  }

  #[test]
  fn remove_tracks_sliding_window() {
    let values = [12.0, 7.0, 300.0, 45.0, 9.0, 61.0, 3.0];
    let mut s = RunningStats::new();
    for (i, v) in values.iter().enumerate() {
      s.push(*v);
      if i >= 3 {
        s.remove(values[i - 3]);
      }
    }
    let window = &values[values.len() - 3..];
    assert_eq!(s.count(), 3);
    assert!((s.mean() - mean(window)).abs() < 1e-9);
    assert!((s.variance().unwrap() - naive_sample_variance(window)).abs() < 1e-6);
  }

  #[test]
  fn variance_never_negative() {
    let mut s = RunningStats::new();
    for _ in 0..50 {
      s.push(0.1);
    }
    for _ in 0..48 {
      s.remove(0.1);
    }
    assert!(s.variance().unwrap() >= 0.0);
  }

  #[test]
  fn remove_last_sample_resets() {
    let mut s = RunningStats::new();
    s.push(5.0);
    s.remove(5.0);
    assert_eq!(s, RunningStats::default());
  }

  #[test]
  fn cv_of_uniform_values_is_zero() {
    assert_eq!(coefficient_of_variation(&[4.0, 4.0, 4.0]), 0.0);
    assert_eq!(coefficient_of_variation(&[]), 0.0);
  }
}
