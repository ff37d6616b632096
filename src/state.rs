//! Sampler state for the two-class model.
//!
//! For every label `l` and word `i` the state keeps
//!
//! ```text
//! word_counts[l][i] = gamma_theta[i] + Σ_{d : label_d = l} count_d(i)
//! class_counts[l]   = gamma_pi[l]    + |{d : label_d = l}|
//! ```
//!
//! except while a single document is retracted during an update.

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Bernoulli, Beta, Distribution};

use crate::bag::SparseCounts;
use crate::config::Hyperparameters;
use crate::distributions::Dirichlet;
use crate::error::{Error, Result};
use crate::label::Label;

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusState {
    pub(crate) class_counts: [f64; 2],
    // 2 x V
    pub(crate) word_counts: Array2<f64>,
    pub(crate) labels: Vec<Label>,
    // 2 x V, rows are probability vectors
    pub(crate) theta: Array2<f64>,
}

fn check_documents<D: SparseCounts>(docs: &[D], vocab_size: usize) -> Result<()> {
    for (d, doc) in docs.iter().enumerate() {
        if let Some((index, _)) = doc.counts().find(|&(i, _)| i >= vocab_size) {
            return Err(Error::WordOutOfRange { doc: d, index, vocab_size });
        }
    }
    Ok(())
}

impl CorpusState {
    /// Draws an initial state: a mixture weight from the Beta prior, a label
    /// for every document after the `observed` prefix, and both topics from
    /// the Dirichlet prior. Counts are then accumulated from the labels.
    pub fn initialize<D, R>(docs: &[D], observed: &[Label], hyper: &Hyperparameters, rng: &mut R) -> Result<CorpusState>
        where D: SparseCounts, R: Rng + ?Sized
    {
        if observed.len() > docs.len() {
            return Err(Error::DimensionMismatch { what: "observed labels", expected: docs.len(), actual: observed.len() });
        }
        check_documents(docs, hyper.vocab_size())?;

        let [a, b] = hyper.gamma_pi();
        let beta = Beta::new(a, b).map_err(|e| Error::Numerical { doc: 0, reason: e.to_string() })?;
        let pi: f64 = beta.sample(rng);
        let bernoulli = Bernoulli::new(pi).map_err(|e| Error::Numerical { doc: 0, reason: format!("mixture weight {}: {}", pi, e) })?;
        let mut labels = observed.to_vec();
        labels.extend((observed.len()..docs.len()).map(|_| Label::from_bernoulli(bernoulli.sample(rng))));

        let mut theta = Array2::zeros((2, hyper.vocab_size()));
        let prior = Dirichlet::new(hyper.gamma_theta().view())
            .map_err(|e| Error::TopicDegenerate { label: 0, reason: e.to_string() })?;
        for label in Label::ALL {
            prior.sample_into(rng, theta.row_mut(label.index()))
                .map_err(|e| Error::TopicDegenerate { label: label.index(), reason: e.to_string() })?;
        }

        Ok(CorpusState::accumulate(docs, labels, theta, hyper))
    }

    /// Builds the state for a given labelling and pair of topics.
    pub fn with_assignment<D>(docs: &[D], labels: Vec<Label>, theta: Array2<f64>, hyper: &Hyperparameters) -> Result<CorpusState>
        where D: SparseCounts
    {
        if labels.len() != docs.len() {
            return Err(Error::DimensionMismatch { what: "labels", expected: docs.len(), actual: labels.len() });
        }
        if theta.dim() != (2, hyper.vocab_size()) {
            return Err(Error::DimensionMismatch { what: "topic columns", expected: hyper.vocab_size(), actual: theta.ncols() });
        }
        check_documents(docs, hyper.vocab_size())?;
        Ok(CorpusState::accumulate(docs, labels, theta, hyper))
    }

    fn accumulate<D: SparseCounts>(docs: &[D], labels: Vec<Label>, theta: Array2<f64>, hyper: &Hyperparameters) -> CorpusState {
        let (class_counts, word_counts) = reconstruct_counts(docs, &labels, hyper);
        CorpusState { class_counts, word_counts, labels, theta }
    }

    fn shift<D: SparseCounts>(&mut self, doc: &D, label: Label, delta: f64) {
        let mut row = self.word_counts.row_mut(label.index());
        for (i, c) in doc.counts() {
            row[i] += delta * c as f64;
        }
        self.class_counts[label.index()] += delta;
    }

    /// Removes document `j` from the counts of its current label and returns
    /// that label.
    pub(crate) fn retract<D: SparseCounts>(&mut self, j: usize, doc: &D) -> Label {
        let label = self.labels[j];
        self.shift(doc, label, -1.0);
        label
    }

    /// Adds document `j` back under `label`.
    pub(crate) fn reinsert<D: SparseCounts>(&mut self, j: usize, doc: &D, label: Label) {
        self.labels[j] = label;
        self.shift(doc, label, 1.0);
    }

    pub fn class_counts(&self) -> [f64; 2] {
        self.class_counts
    }

    pub fn word_counts(&self) -> &Array2<f64> {
        &self.word_counts
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn theta(&self) -> &Array2<f64> {
        &self.theta
    }

    pub fn vocab_size(&self) -> usize {
        self.word_counts.ncols()
    }

    /// Log-probability of the corpus words under the current topics and
    /// labels.
    pub fn log_likelihood<D: SparseCounts>(&self, docs: &[D]) -> f64 {
        docs.iter().zip(&self.labels).map(|(doc, label)| {
            let row = self.theta.row(label.index());
            doc.counts().map(|(i, c)| c as f64 * row[i].ln()).sum::<f64>()
        }).sum()
    }

    /// Largest absolute difference between the maintained counts and counts
    /// rebuilt from scratch for the current labels.
    pub fn count_drift<D: SparseCounts>(&self, docs: &[D], hyper: &Hyperparameters) -> f64 {
        let (class_counts, word_counts) = reconstruct_counts(docs, &self.labels, hyper);
        let class_drift = class_counts.iter().zip(&self.class_counts)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        word_counts.iter().zip(self.word_counts.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(class_drift, f64::max)
    }
}

/// Counts implied by `labels`, computed from the priors up.
pub fn reconstruct_counts<D: SparseCounts>(docs: &[D], labels: &[Label], hyper: &Hyperparameters) -> ([f64; 2], Array2<f64>) {
    let mut class_counts = hyper.gamma_pi();
    let mut word_counts = Array2::zeros((2, hyper.vocab_size()));
    for mut row in word_counts.rows_mut() {
        row.assign(hyper.gamma_theta());
    }
    for (doc, label) in docs.iter().zip(labels) {
        let mut row = word_counts.row_mut(label.index());
        for (i, c) in doc.counts() {
            row[i] += c as f64;
        }
        class_counts[label.index()] += 1.0;
    }
    (class_counts, word_counts)
}
