use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::bag::Bag;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DrawError {
    #[error("weight {index} is {value}, expected a finite nonnegative number")]
    BadWeight { index: usize, value: f64 },

    #[error("weights sum to zero")]
    ZeroMass,

    #[error("concentration {index} is {value}, expected a finite positive number")]
    BadConcentration { index: usize, value: f64 },

    #[error("component {0} underflowed to zero")]
    ZeroComponent(usize),
}

/// Categorical distribution over `0..k`, sampled by bisecting the cumulative
/// weights.
#[derive(Clone, Debug)]
pub struct Categorical {
    cumulative: Vec<f64>,
}

impl Categorical {
    /// Weights need not be normalized.
    pub fn new<I>(weights: I) -> Result<Categorical, DrawError>
        where I: IntoIterator<Item = f64>
    {
        let mut sum = 0.0;
        let mut cumulative = Vec::new();
        for (index, w) in weights.into_iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(DrawError::BadWeight { index, value: w });
            }
            sum += w;
            cumulative.push(sum);
        }
        if sum <= 0.0 {
            return Err(DrawError::ZeroMass);
        }
        Ok(Categorical { cumulative })
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}

impl Distribution<usize> for Categorical {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let total = self.cumulative[self.cumulative.len() - 1];
        let x = rng.gen::<f64>() * total;
        // Entries with zero weight repeat the previous sum and are never hit.
        let k = self.cumulative.partition_point(|&c| c <= x);
        k.min(self.cumulative.len() - 1)
    }
}

/// Dirichlet distribution, drawn as normalized independent Gamma(α_k, 1)
/// variates.
#[derive(Clone, Debug)]
pub struct Dirichlet<'a> {
    alpha: ArrayView1<'a, f64>,
}

impl<'a> Dirichlet<'a> {
    pub fn new(alpha: ArrayView1<'a, f64>) -> Result<Dirichlet<'a>, DrawError> {
        for (index, &a) in alpha.iter().enumerate() {
            if !a.is_finite() || a <= 0.0 {
                return Err(DrawError::BadConcentration { index, value: a });
            }
        }
        Ok(Dirichlet { alpha })
    }

    /// Writes one draw into `out`, which must have the length of `alpha`.
    /// Every component of the result is strictly positive.
    pub fn sample_into<R: Rng + ?Sized>(&self, rng: &mut R, mut out: ArrayViewMut1<f64>) -> Result<(), DrawError> {
        debug_assert_eq!(out.len(), self.alpha.len());
        let mut sum = 0.0;
        for (index, (x, &a)) in out.iter_mut().zip(self.alpha.iter()).enumerate() {
            let gamma = Gamma::new(a, 1.0).map_err(|_| DrawError::BadConcentration { index, value: a })?;
            let y = gamma.sample(rng);
            *x = y;
            sum += y;
        }
        if !(sum > 0.0) {
            return Err(DrawError::ZeroMass);
        }
        for (index, x) in out.iter_mut().enumerate() {
            *x /= sum;
            if !(*x > 0.0) {
                return Err(DrawError::ZeroComponent(index));
            }
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Array1<f64>, DrawError> {
        let mut out = Array1::zeros(self.alpha.len());
        self.sample_into(rng, out.view_mut())?;
        Ok(out)
    }
}

/// Multinomial over the categories of a [`Categorical`], producing a bag of
/// `trials` word occurrences.
#[derive(Clone, Debug)]
pub struct Multinomial<'a> {
    trials: usize,
    categorical: &'a Categorical,
}

impl<'a> Multinomial<'a> {
    pub fn new(trials: usize, categorical: &'a Categorical) -> Multinomial<'a> {
        Multinomial { trials, categorical }
    }
}

impl<'a> Distribution<Bag> for Multinomial<'a> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Bag {
        Bag::from_words((0..self.trials).map(|_| self.categorical.sample(rng)))
    }
}
