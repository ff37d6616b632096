use nbgibbs::sampler::sweep;
use nbgibbs::{Bag, CorpusState, Hyperparameters, Label};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const VOCAB: usize = 12;

fn arb_bag() -> impl Strategy<Value = Bag> {
    prop::collection::vec((0..VOCAB, 0usize..4), 0..6).prop_map(Bag::from_counts)
}

fn arb_label() -> impl Strategy<Value = Label> {
    prop_oneof![Just(Label::Zero), Just(Label::One)]
}

proptest! {
    #[test]
    fn sweeps_preserve_count_invariant(
        docs in prop::collection::vec(arb_bag(), 2..20),
        prefix in prop::collection::vec(arb_label(), 0..20),
        gamma_pi in (1.0f64..3.0, 1.0f64..3.0),
        gamma_theta in prop::collection::vec(0.1f64..2.0, VOCAB),
        seed in any::<u64>(),
    ) {
        let m = prefix.len().min(docs.len());
        let observed = &prefix[..m];
        let hyper = Hyperparameters::new([gamma_pi.0, gamma_pi.1], gamma_theta).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = CorpusState::initialize(&docs, observed, &hyper, &mut rng).unwrap();
        for _ in 0..5 {
            sweep(&mut state, &docs, m..docs.len(), &mut rng).unwrap();
            prop_assert!(state.count_drift(&docs, &hyper) < 1e-9);
            prop_assert_eq!(&state.labels()[..m], observed);
            let total: f64 = state.class_counts().iter().sum();
            prop_assert!((total - (gamma_pi.0 + gamma_pi.1 + docs.len() as f64)).abs() < 1e-9);
            for row in state.theta().rows() {
                prop_assert!(row.iter().all(|&p| p > 0.0));
                prop_assert!((row.sum() - 1.0).abs() < 1e-9);
            }
        }
    }
}
