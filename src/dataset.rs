//! Synthetic corpora drawn from the generative model, and scoring of
//! inferred labels against the truth.

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Bernoulli, Beta, Distribution, Poisson};

use crate::bag::Bag;
use crate::config::{Hyperparameters, SamplerConfig};
use crate::distributions::{Categorical, Dirichlet, Multinomial};
use crate::error::{Error, Result};
use crate::label::Label;
use crate::sampler::infer_labels;

/// A generated corpus together with the parameters that produced it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub documents: Vec<Bag>,
    pub labels: Vec<Label>,
    pub pi: f64,
    pub theta: Array2<f64>,
}

/// Draws `num_docs` documents: π ~ Beta(gamma_pi), each label ~ Bernoulli(π),
/// θ_l ~ Dirichlet(gamma_theta), each length ~ Poisson(`mean_length`) and the
/// words ~ Multinomial(length, θ_label).
pub fn make_dataset<R>(num_docs: usize, mean_length: f64, hyper: &Hyperparameters, rng: &mut R) -> Result<Dataset>
    where R: Rng + ?Sized
{
    let lengths = Poisson::new(mean_length)
        .map_err(|_| Error::InvalidHyperparameter { param: "mean_length".to_string(), value: mean_length })?;
    let [a, b] = hyper.gamma_pi();
    let pi: f64 = Beta::new(a, b)
        .map_err(|e| Error::Numerical { doc: 0, reason: e.to_string() })?
        .sample(rng);
    let bernoulli = Bernoulli::new(pi).map_err(|e| Error::Numerical { doc: 0, reason: e.to_string() })?;

    let mut theta = Array2::zeros((2, hyper.vocab_size()));
    let dir = Dirichlet::new(hyper.gamma_theta().view())
        .map_err(|e| Error::TopicDegenerate { label: 0, reason: e.to_string() })?;
    let mut topics = Vec::with_capacity(2);
    for label in Label::ALL {
        let l = label.index();
        dir.sample_into(rng, theta.row_mut(l))
            .map_err(|e| Error::TopicDegenerate { label: l, reason: e.to_string() })?;
        let cat = Categorical::new(theta.row(l).iter().cloned())
            .map_err(|e| Error::TopicDegenerate { label: l, reason: e.to_string() })?;
        topics.push(cat);
    }

    let mut documents = Vec::with_capacity(num_docs);
    let mut labels = Vec::with_capacity(num_docs);
    for _ in 0..num_docs {
        let label = Label::from_bernoulli(bernoulli.sample(rng));
        let n_d = lengths.sample(rng) as usize;
        let words = Multinomial::new(n_d, &topics[label.index()]);
        documents.push(words.sample(rng));
        labels.push(label);
    }
    Ok(Dataset { documents, labels, pi, theta })
}

/// Number of leading documents treated as observed for `fraction` of `n`.
pub fn split_observed(n: usize, fraction: f64) -> Result<usize> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(Error::InvalidHyperparameter { param: "observed fraction".to_string(), value: fraction });
    }
    Ok(((n as f64 * fraction).floor() as usize).min(n))
}

/// Fraction of positions where `predicted` agrees with `truth`. An empty
/// comparison scores 1.0.
pub fn accuracy(predicted: &[Label], truth: &[Label]) -> Result<f64> {
    if predicted.len() != truth.len() {
        return Err(Error::DimensionMismatch { what: "predicted labels", expected: truth.len(), actual: predicted.len() });
    }
    if truth.is_empty() {
        return Ok(1.0);
    }
    let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    Ok(hits as f64 / truth.len() as f64)
}

/// A synthetic classification run: generate, hide the labels past the
/// observed prefix, infer them, and score.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub num_docs: usize,
    pub vocab_size: usize,
    pub mean_length: f64,
    pub observed_fraction: f64,
}

impl Default for Experiment {
    fn default() -> Experiment {
        Experiment {
            num_docs: 400,
            vocab_size: 10000,
            mean_length: 25.0,
            observed_fraction: 0.8,
        }
    }
}

impl Experiment {
    /// Returns the accuracy on the held-out documents.
    pub fn run<R: Rng + ?Sized>(&self, config: &SamplerConfig, rng: &mut R) -> Result<f64> {
        let hyper = config.hyperparameters(self.vocab_size)?;
        let data = make_dataset(self.num_docs, self.mean_length, &hyper, rng)?;
        let m = split_observed(self.num_docs, self.observed_fraction)?;
        let inferred = infer_labels(&data.documents, &data.labels[..m], &hyper, config.iterations, rng)?;
        accuracy(&inferred, &data.labels[m..])
    }
}
