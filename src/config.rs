use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array1;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Validated prior pseudo-counts: `gamma_pi` for the two class sizes and
/// `gamma_theta` for every vocabulary entry.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Hyperparameters {
    gamma_pi: [f64; 2],
    gamma_theta: Array1<f64>,
}

fn check_positive(param: String, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidHyperparameter { param, value })
    }
}

impl Hyperparameters {
    pub fn new(gamma_pi: [f64; 2], gamma_theta: Vec<f64>) -> Result<Hyperparameters> {
        if gamma_theta.is_empty() {
            return Err(Error::DimensionMismatch { what: "gamma_theta (vocabulary size)", expected: 1, actual: 0 });
        }
        for (l, &g) in gamma_pi.iter().enumerate() {
            check_positive(format!("gamma_pi[{}]", l), g)?;
        }
        for (i, &g) in gamma_theta.iter().enumerate() {
            check_positive(format!("gamma_theta[{}]", i), g)?;
        }
        Ok(Hyperparameters {
            gamma_pi,
            gamma_theta: Array1::from(gamma_theta),
        })
    }

    /// The same `gamma_theta` for every word of a vocabulary of `vocab_size`.
    pub fn symmetric(gamma_pi: [f64; 2], gamma_theta: f64, vocab_size: usize) -> Result<Hyperparameters> {
        Hyperparameters::new(gamma_pi, vec![gamma_theta; vocab_size])
    }

    pub fn gamma_pi(&self) -> [f64; 2] {
        self.gamma_pi
    }

    pub fn gamma_theta(&self) -> &Array1<f64> {
        &self.gamma_theta
    }

    pub fn vocab_size(&self) -> usize {
        self.gamma_theta.len()
    }
}

/// Run settings. Every field has a default so a config file may name only
/// what it changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    pub iterations: usize,
    pub seed: Option<u64>,
    pub gamma_pi: [f64; 2],
    pub gamma_theta: f64,
}

impl Default for SamplerConfig {
    fn default() -> SamplerConfig {
        SamplerConfig {
            iterations: 100,
            seed: None,
            gamma_pi: [1.0, 1.0],
            gamma_theta: 1.0,
        }
    }
}

impl SamplerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<SamplerConfig> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Parse { line: e.line(), reason: e.to_string() })
    }

    pub fn hyperparameters(&self, vocab_size: usize) -> Result<Hyperparameters> {
        Hyperparameters::symmetric(self.gamma_pi, self.gamma_theta, vocab_size)
    }
}
