//! Semi-supervised two-class Naive Bayes by collapsed Gibbs sampling.
//!
//! Documents are sparse word-count bags. The first documents of a corpus
//! carry known labels; the sampler infers the rest:
//!
//! ```
//! use nbgibbs::{infer_labels, Bag, Hyperparameters, Label};
//! use rand::SeedableRng;
//!
//! let docs = vec![
//!     Bag::from_words(vec![0, 0, 1]),
//!     Bag::from_words(vec![2, 3]),
//!     Bag::from_words(vec![0, 1, 1]),
//! ];
//! let observed = [Label::Zero, Label::One];
//! let hyper = Hyperparameters::symmetric([1.0, 1.0], 1.0, 4)?;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let inferred = infer_labels(&docs, &observed, &hyper, 100, &mut rng)?;
//! assert_eq!(inferred.len(), 1);
//! # Ok::<(), nbgibbs::Error>(())
//! ```

pub mod bag;
pub mod config;
pub mod dataset;
pub mod distributions;
pub mod error;
pub mod label;
pub mod logging;
pub mod sampler;
pub mod state;

pub use bag::{Bag, SparseCounts};
pub use config::{Hyperparameters, SamplerConfig};
pub use error::{Error, Result};
pub use label::Label;
pub use sampler::{infer_labels, Model, Sampler};
pub use state::CorpusState;
