//! Collapsed Gibbs updates for the document labels.
//!
//! The mixture weight is integrated out. Each sweep visits the free
//! documents in order; every visit retracts the document from the counts,
//! resamples its label from
//!
//! ```text
//! P(L_j = l | rest) ∝ (C_l - 1) / (C_0 + C_1 - 1) · Π_i θ_l[i]^count_j(i)
//! ```
//!
//! and reinserts it. The sweep ends by drawing both topics from their
//! Dirichlet posteriors.

use std::ops::{ControlFlow, Range};

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};
use serde_derive::Serialize;
use tracing::{debug, info, trace};

use crate::bag::SparseCounts;
use crate::config::Hyperparameters;
use crate::distributions::Dirichlet;
use crate::error::{Error, Result};
use crate::label::Label;
use crate::state::CorpusState;

/// Full conditional of one label given everything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conditional {
    /// The retracted class has only its pseudo-count left. The label is
    /// assigned to the other class without a draw.
    Forced(Label),
    /// Probability of `Label::One`.
    Probability(f64),
}

/// Unnormalized log-weights `[v0, v1]` of a retracted document.
pub(crate) fn log_weights<D: SparseCounts>(state: &CorpusState, j: usize, doc: &D) -> Result<[f64; 2]> {
    let [c0, c1] = state.class_counts;
    let d = c0 + c1 - 1.0;
    let mut v = [0.0; 2];
    for label in Label::ALL {
        let l = label.index();
        let prior = (state.class_counts[l] - 1.0) / d;
        if !(prior > 0.0) || !prior.is_finite() {
            return Err(Error::Numerical {
                doc: j,
                reason: format!("class {} prior ratio is {} (class counts {:?})", l, prior, state.class_counts),
            });
        }
        let row = state.theta.row(l);
        v[l] = prior.ln() + doc.counts().map(|(i, c)| c as f64 * row[i].ln()).sum::<f64>();
    }
    Ok(v)
}

/// Conditional label distribution of document `j`, which must already be
/// retracted from `state`.
pub fn conditional<D: SparseCounts>(state: &CorpusState, j: usize, doc: &D) -> Result<Conditional> {
    // A class count of exactly 1 makes its prior ratio zero below, so the
    // document goes to the other class outright.
    if state.class_counts[0] == 1.0 {
        return Ok(Conditional::Forced(Label::One));
    }
    if state.class_counts[1] == 1.0 {
        return Ok(Conditional::Forced(Label::Zero));
    }
    let [v0, v1] = log_weights(state, j, doc)?;
    let m = v0.max(v1);
    let (e0, e1) = ((v0 - m).exp(), (v1 - m).exp());
    let pi = e1 / (e0 + e1);
    if !(0.0..=1.0).contains(&pi) {
        return Err(Error::Numerical { doc: j, reason: format!("log-weights {} and {} give probability {}", v0, v1, pi) });
    }
    Ok(Conditional::Probability(pi))
}

fn draw_label<R: Rng + ?Sized>(j: usize, cond: Conditional, rng: &mut R) -> Result<Label> {
    match cond {
        Conditional::Forced(label) => {
            trace!(doc = j, %label, "label forced");
            Ok(label)
        }
        Conditional::Probability(pi) => {
            let bernoulli = Bernoulli::new(pi).map_err(|e| Error::Numerical { doc: j, reason: e.to_string() })?;
            Ok(Label::from_bernoulli(bernoulli.sample(rng)))
        }
    }
}

/// Retracts, relabels and reinserts document `j`. On error the document is
/// reinserted under its previous label.
pub fn update_document<D, R>(state: &mut CorpusState, j: usize, doc: &D, rng: &mut R) -> Result<Label>
    where D: SparseCounts, R: Rng + ?Sized
{
    let old = state.retract(j, doc);
    let new = match conditional(state, j, doc).and_then(|cond| draw_label(j, cond, rng)) {
        Ok(label) => label,
        Err(e) => {
            state.reinsert(j, doc, old);
            return Err(e);
        }
    };
    state.reinsert(j, doc, new);
    Ok(new)
}

/// Draws each topic from `Dirichlet(word_counts[l])`.
pub fn resample_topics<R: Rng + ?Sized>(state: &mut CorpusState, rng: &mut R) -> Result<()> {
    let CorpusState { word_counts, theta, .. } = state;
    for label in Label::ALL {
        let l = label.index();
        let posterior = Dirichlet::new(word_counts.row(l))
            .map_err(|e| Error::TopicDegenerate { label: l, reason: e.to_string() })?;
        posterior.sample_into(rng, theta.row_mut(l))
            .map_err(|e| Error::TopicDegenerate { label: l, reason: e.to_string() })?;
    }
    Ok(())
}

/// One sweep: every document in `free` is updated in order, then the topics
/// are resampled.
pub fn sweep<D, R>(state: &mut CorpusState, docs: &[D], free: Range<usize>, rng: &mut R) -> Result<()>
    where D: SparseCounts, R: Rng + ?Sized
{
    if docs.len() != state.labels.len() {
        return Err(Error::DimensionMismatch { what: "documents", expected: state.labels.len(), actual: docs.len() });
    }
    if free.end > docs.len() {
        return Err(Error::DimensionMismatch { what: "free documents", expected: docs.len(), actual: free.end });
    }
    for j in free {
        update_document(state, j, &docs[j], rng)?;
    }
    resample_topics(state, rng)
}

/// Runs the sampler over a corpus whose first `observed.len()` documents
/// have known labels.
pub struct Sampler<'a, D> {
    docs: &'a [D],
    observed: &'a [Label],
    hyper: &'a Hyperparameters,
}

impl<'a, D: SparseCounts> Sampler<'a, D> {
    pub fn new(docs: &'a [D], observed: &'a [Label], hyper: &'a Hyperparameters) -> Sampler<'a, D> {
        Sampler { docs, observed, hyper }
    }

    pub fn free(&self) -> Range<usize> {
        self.observed.len()..self.docs.len()
    }

    pub fn run<R: Rng + ?Sized>(&self, iterations: usize, rng: &mut R) -> Result<CorpusState> {
        self.run_with(iterations, rng, |_, _| ControlFlow::Continue(()))
    }

    /// Like [`run`](Sampler::run), calling `observer` with the zero-based
    /// sweep index after every sweep. `ControlFlow::Break` ends the run early.
    pub fn run_with<R, F>(&self, iterations: usize, rng: &mut R, mut observer: F) -> Result<CorpusState>
        where R: Rng + ?Sized, F: FnMut(usize, &CorpusState) -> ControlFlow<()>
    {
        let mut state = CorpusState::initialize(self.docs, self.observed, self.hyper, rng)?;
        info!(
            documents = self.docs.len(),
            observed = self.observed.len(),
            vocab_size = self.hyper.vocab_size(),
            iterations,
            "sampler initialized"
        );
        for s in 0..iterations {
            sweep(&mut state, self.docs, self.free(), rng)?;
            debug!(
                sweep = s + 1,
                log_likelihood = state.log_likelihood(self.docs),
                class_counts = ?state.class_counts(),
                "sweep finished"
            );
            if observer(s, &state).is_break() {
                info!(sweeps = s + 1, "sampler stopped early");
                return Ok(state);
            }
        }
        info!(sweeps = iterations, "sampler finished");
        Ok(state)
    }

    /// Labels of the documents after the observed prefix.
    pub fn inferred<'s>(&self, state: &'s CorpusState) -> &'s [Label] {
        &state.labels()[self.observed.len()..]
    }
}

/// Initializes a state, runs `iterations` sweeps and returns the labels of
/// the unobserved documents.
pub fn infer_labels<D, R>(docs: &[D], observed: &[Label], hyper: &Hyperparameters, iterations: usize, rng: &mut R) -> Result<Vec<Label>>
    where D: SparseCounts, R: Rng + ?Sized
{
    let sampler = Sampler::new(docs, observed, hyper);
    let state = sampler.run(iterations, rng)?;
    Ok(sampler.inferred(&state).to_vec())
}

/// Final sampler output, as written by `--model`.
#[derive(Serialize, Debug)]
pub struct Model {
    pub hyperparameters: Hyperparameters,
    pub sweeps: usize,
    pub num_observed: usize,
    pub inferred_labels: Vec<Label>,
    pub class_counts: [f64; 2],
    pub theta: Array2<f64>,
}

impl Model {
    pub fn new(state: CorpusState, hyper: &Hyperparameters, num_observed: usize, sweeps: usize) -> Model {
        let CorpusState { class_counts, labels, theta, .. } = state;
        Model {
            hyperparameters: hyper.clone(),
            sweeps,
            num_observed,
            inferred_labels: labels[num_observed..].to_vec(),
            class_counts,
            theta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::Bag;
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_word_theta() -> Array2<f64> {
        arr2(&[[0.9, 0.1], [0.2, 0.8]])
    }

    #[test]
    fn sole_member_of_class_zero_moves_to_class_one() {
        let docs = vec![Bag::from_words(vec![0]), Bag::from_words(vec![0, 0])];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 2).unwrap();
        for seed in 0..20 {
            let mut state = CorpusState::with_assignment(&docs, vec![Label::One, Label::Zero], two_word_theta(), &hyper).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let label = update_document(&mut state, 1, &docs[1], &mut rng).unwrap();
            assert_eq!(label, Label::One);
            assert_eq!(state.labels(), &[Label::One, Label::One]);
            assert_eq!(state.class_counts(), [1.0, 3.0]);
        }
    }

    #[test]
    fn sole_member_of_class_one_moves_to_class_zero() {
        let docs = vec![Bag::from_words(vec![1]), Bag::from_words(vec![1, 1])];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 2).unwrap();
        for seed in 0..20 {
            let mut state = CorpusState::with_assignment(&docs, vec![Label::Zero, Label::One], two_word_theta(), &hyper).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            state.retract(1, &docs[1]);
            assert_eq!(conditional(&state, 1, &docs[1]).unwrap(), Conditional::Forced(Label::Zero));
            state.reinsert(1, &docs[1], Label::One);
            update_document(&mut state, 1, &docs[1], &mut rng).unwrap();
            assert_eq!(state.labels()[1], Label::Zero);
        }
    }

    #[test]
    fn general_conditional_matches_closed_form() {
        let docs = vec![
            Bag::from_words(vec![1]),
            Bag::from_words(vec![1]),
            Bag::from_words(vec![0]),
            Bag::from_words(vec![0, 0, 0]),
        ];
        let labels = vec![Label::Zero, Label::Zero, Label::One, Label::Zero];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 2).unwrap();
        let mut state = CorpusState::with_assignment(&docs, labels, two_word_theta(), &hyper).unwrap();
        state.retract(3, &docs[3]);
        assert_eq!(state.class_counts(), [3.0, 2.0]);
        let w0 = 2.0 / 4.0 * 0.9f64.powi(3);
        let w1 = 1.0 / 4.0 * 0.2f64.powi(3);
        match conditional(&state, 3, &docs[3]).unwrap() {
            Conditional::Probability(pi) => assert!((pi - w1 / (w0 + w1)).abs() < 1e-12),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn long_documents_do_not_underflow() {
        let docs = vec![
            Bag::from_words(vec![1]),
            Bag::from_words(vec![0]),
            Bag::from_counts(vec![(0, 5000), (1, 4000)]),
        ];
        let labels = vec![Label::Zero, Label::One, Label::Zero];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 2).unwrap();
        let theta = arr2(&[[0.5, 0.5], [0.6, 0.4]]);
        let mut state = CorpusState::with_assignment(&docs, labels, theta, &hyper).unwrap();
        state.retract(2, &docs[2]);
        let [v0, v1] = log_weights(&state, 2, &docs[2]).unwrap();
        assert!(v0 < -5000.0 && v1 < -5000.0);
        match conditional(&state, 2, &docs[2]).unwrap() {
            Conditional::Probability(pi) => {
                assert!(pi.is_finite());
                assert!((0.0..=1.0).contains(&pi));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_document_contributes_only_priors() {
        let docs = vec![
            Bag::from_words(vec![1]),
            Bag::from_words(vec![0]),
            Bag::from_words(vec![0]),
            Bag::new(),
        ];
        let labels = vec![Label::Zero, Label::One, Label::One, Label::One];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 2).unwrap();
        let mut state = CorpusState::with_assignment(&docs, labels, two_word_theta(), &hyper).unwrap();
        let counts = state.word_counts().clone();
        state.retract(3, &docs[3]);
        assert_eq!(state.word_counts(), &counts);
        let [v0, v1] = log_weights(&state, 3, &docs[3]).unwrap();
        assert_eq!(state.class_counts(), [2.0, 3.0]);
        assert!((v0 - 0.25f64.ln()).abs() < 1e-12);
        assert!((v1 - 0.5f64.ln()).abs() < 1e-12);
    }

    proptest::proptest! {
        #[test]
        fn conditional_is_a_probability(
            words in proptest::collection::vec(proptest::collection::vec(0usize..6, 0..40), 3..12),
            seed in proptest::prelude::any::<u64>(),
        ) {
            let docs: Vec<Bag> = words.into_iter().map(Bag::from_words).collect();
            let labels: Vec<Label> = (0..docs.len()).map(|d| Label::from_bernoulli(d % 3 == 0)).collect();
            let hyper = Hyperparameters::symmetric([1.0, 1.0], 0.5, 6).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let theta = Array2::from_elem((2, 6), 1.0 / 6.0);
            let mut state = CorpusState::with_assignment(&docs, labels, theta, &hyper).unwrap();
            resample_topics(&mut state, &mut rng).unwrap();
            for (j, doc) in docs.iter().enumerate() {
                let label = state.retract(j, doc);
                match conditional(&state, j, doc).unwrap() {
                    Conditional::Probability(pi) => proptest::prop_assert!((0.0..=1.0).contains(&pi)),
                    Conditional::Forced(_) => {}
                }
                state.reinsert(j, doc, label);
            }
        }
    }

    #[test]
    fn degenerate_prior_is_reported_and_state_restored() {
        let docs = vec![Bag::from_words(vec![0]), Bag::from_words(vec![1])];
        let hyper = Hyperparameters::symmetric([0.5, 0.5], 1.0, 2).unwrap();
        let mut state = CorpusState::with_assignment(&docs, vec![Label::One, Label::Zero], two_word_theta(), &hyper).unwrap();
        let before = state.clone();
        let mut rng = StdRng::seed_from_u64(5);
        match update_document(&mut state, 1, &docs[1], &mut rng) {
            Err(Error::Numerical { doc, .. }) => assert_eq!(doc, 1),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state, before);
    }

    #[test]
    fn sweep_preserves_counts_and_normalizes_topics() {
        let docs: Vec<Bag> = (0..30)
            .map(|d| Bag::from_words((0..(d % 7)).map(|k| (d * 3 + k) % 11)))
            .collect();
        let hyper = Hyperparameters::new([1.0, 1.0], (0..11).map(|i| 0.1 + i as f64 * 0.05).collect()).unwrap();
        let observed: Vec<Label> = (0..10).map(|d| Label::from_bernoulli(d % 2 == 0)).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let mut state = CorpusState::initialize(&docs, &observed, &hyper, &mut rng).unwrap();
        for _ in 0..20 {
            sweep(&mut state, &docs, 10..30, &mut rng).unwrap();
            assert!(state.count_drift(&docs, &hyper) < 1e-9);
            assert_eq!(&state.labels()[..10], &observed[..]);
            for row in state.theta().rows() {
                assert!(row.iter().all(|&p| p > 0.0));
                assert!((row.sum() - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn sweep_rejects_out_of_range_free_set() {
        let docs = vec![Bag::from_words(vec![0]), Bag::from_words(vec![1])];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 2).unwrap();
        let mut state = CorpusState::with_assignment(&docs, vec![Label::Zero, Label::One], two_word_theta(), &hyper).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sweep(&mut state, &docs, 1..3, &mut rng).is_err());
        assert!(sweep(&mut state, &docs[..1], 0..1, &mut rng).is_err());
    }

    #[test]
    fn observer_can_stop_between_sweeps() {
        let docs: Vec<Bag> = (0..8).map(|d| Bag::from_words(vec![d % 3, (d + 1) % 3])).collect();
        let observed = vec![Label::Zero, Label::One, Label::Zero];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 3).unwrap();
        let sampler = Sampler::new(&docs, &observed, &hyper);
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = Vec::new();
        let state = sampler.run_with(100, &mut rng, |s, _| {
            seen.push(s);
            if s == 2 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        }).unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(sampler.inferred(&state).len(), 5);
    }

    #[test]
    fn model_keeps_only_inferred_labels() {
        let docs: Vec<Bag> = (0..6).map(|d| Bag::from_words(vec![d % 2])).collect();
        let observed = vec![Label::Zero, Label::One];
        let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let state = Sampler::new(&docs, &observed, &hyper).run(3, &mut rng).unwrap();
        let expected = state.labels()[2..].to_vec();
        let model = Model::new(state, &hyper, observed.len(), 3);
        assert_eq!(model.inferred_labels, expected);
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["sweeps"], 3);
        assert_eq!(json["inferred_labels"].as_array().unwrap().len(), 4);
    }
}
