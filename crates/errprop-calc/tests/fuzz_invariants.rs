use errprop_calc::{NumArray, Operand, Region, UncertaintyContext};
use ndarray::IxDyn;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn self_difference_is_exact(nominal in -1e3f64..1e3, stddev in 0.0f64..10.0) {
        let ctx = UncertaintyContext::default();
        let a = ctx.uncertain(nominal, stddev).unwrap();
        let diff = &a - &a;
        prop_assert_eq!(diff.stddev().unwrap()[IxDyn(&[])], 0.0);
    }

    #[test]
    fn variances_of_independent_values_add(
        a0 in -1e3f64..1e3,
        b0 in -1e3f64..1e3,
        sa in 0.0f64..10.0,
        sb in 0.0f64..10.0,
    ) {
        let ctx = UncertaintyContext::default();
        let a = ctx.uncertain(a0, sa).unwrap();
        let b = ctx.uncertain(b0, sb).unwrap();
        let variance = (&a + &b).variance().unwrap()[IxDyn(&[])];
        let expected = sa * sa + sb * sb;
        prop_assert!((variance - expected).abs() <= 1e-12 * expected.max(1.0));
    }

    #[test]
    fn scaling_scales_stddev(
        nominal in -1e3f64..1e3,
        stddev in 0.0f64..10.0,
        factor in -50.0f64..50.0,
    ) {
        let ctx = UncertaintyContext::default();
        let a = ctx.uncertain(nominal, stddev).unwrap();
        let scaled = &a * factor;
        let sd = scaled.stddev().unwrap()[IxDyn(&[])];
        let expected = factor.abs() * stddev;
        prop_assert!((sd - expected).abs() <= 1e-12 * expected.max(1.0));
    }

    #[test]
    fn overwrite_replaces_slot_sources(len in 1usize..6, slot_seed in any::<usize>()) {
        let ctx = UncertaintyContext::default();
        let mut a = ctx.uncertain(vec![1.0; len], 0.1).unwrap();
        let b = ctx.uncertain(2.0, 0.3).unwrap();
        let slot = (slot_seed % len) as isize;
        let before = a.get(&Region::index(slot)).unwrap().sources();

        a.set(&Region::index(slot), &Operand::from(b.clone())).unwrap();

        let after = a.get(&Region::index(slot)).unwrap();
        prop_assert!(after.sources().is_disjoint(&before));
        prop_assert_eq!(after.sources(), b.sources());
        prop_assert_eq!(a.sources().len(), len);
    }

    #[test]
    fn broadcast_sum_is_fully_correlated(len in 1usize..8, stddev in 0.0f64..5.0) {
        let ctx = UncertaintyContext::default();
        let a = ctx.uncertain(3.0, stddev).unwrap();
        let spread = &a + &NumArray::from(vec![0.0; len]);
        let total = spread.sum().unwrap().stddev().unwrap()[IxDyn(&[])];
        let expected = len as f64 * stddev;
        prop_assert!((total - expected).abs() <= 1e-12 * expected.max(1.0));
    }
}
