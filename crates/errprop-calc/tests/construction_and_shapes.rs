use errprop_calc::{
    ufunc, AxisSlice, Complex64, DType, NumArray, Operand, PropError, Region, SourceIdGenerator,
    UncertainValue, UncertaintyContext, UncertaintyProfile, ValueParts,
};
use ndarray::{ArrayD, IxDyn};

fn scalar_stddev(value: &UncertainValue) -> f64 {
    value.stddev().unwrap()[IxDyn(&[])]
}

#[test]
fn construct_accepts_each_supported_combination() {
    let ids = SourceIdGenerator::new();
    let measured = UncertainValue::construct(
        &ids,
        ValueParts {
            nominal: Some(NumArray::from(vec![1.0, 2.0])),
            stddev: Some(NumArray::scalar(0.5)),
            ..ValueParts::default()
        },
    )
    .unwrap();
    assert_eq!(measured.sources().len(), 2);

    let derived = UncertainValue::construct(
        &ids,
        ValueParts {
            nominal: Some(NumArray::from(vec![3.0, 6.0])),
            dependencies: Some(vec![(&measured, NumArray::scalar(3.0))]),
            ..ValueParts::default()
        },
    )
    .unwrap();
    let stddev = derived.stddev().unwrap();
    assert!(stddev.iter().all(|s| (s - 1.5).abs() < 1e-15));

    let adopted = UncertainValue::construct(
        &ids,
        ValueParts {
            nominal: Some(NumArray::from(vec![0.0, 0.0])),
            profile: Some(measured.profile().clone()),
            ..ValueParts::default()
        },
    )
    .unwrap();
    assert_eq!(
        adopted.covariance(&measured).unwrap(),
        measured.variance().unwrap()
    );

    let zeros = UncertainValue::construct(
        &ids,
        ValueParts {
            shape: Some(vec![2, 2]),
            ..ValueParts::default()
        },
    )
    .unwrap();
    assert!(zeros.is_exact());
    assert_eq!(zeros.shape(), &[2, 2]);
}

#[test]
fn construct_rejects_ambiguous_arguments() {
    let ids = SourceIdGenerator::new();
    let err = UncertainValue::construct(&ids, ValueParts::default()).unwrap_err();
    assert!(matches!(err, PropError::InvalidConstruction(_)));
    assert_eq!(err.info().code, "ambiguous-arguments");

    let err = UncertainValue::construct(
        &ids,
        ValueParts {
            nominal: Some(NumArray::scalar(1.0)),
            stddev: Some(NumArray::scalar(0.1)),
            shape: Some(vec![]),
            ..ValueParts::default()
        },
    )
    .unwrap_err();
    let given = err.info().context.get("given").map(String::as_str);
    assert_eq!(given, Some("nominal,stddev,shape"));
    assert_eq!(ids.peek(), 1, "no ids are reserved for rejected arguments");
}

#[test]
fn stddev_must_be_real_and_non_negative() {
    let ctx = UncertaintyContext::default();
    let err = ctx.uncertain(1.0, -0.1).unwrap_err();
    assert_eq!(err.info().code, "negative-stddev");
    let err = ctx.uncertain(1.0, f64::NAN).unwrap_err();
    assert_eq!(err.info().code, "negative-stddev");
    let err = ctx.uncertain(1.0, Complex64::new(0.1, 0.0)).unwrap_err();
    assert_eq!(err.info().code, "complex-stddev");
    let err = ctx.uncertain(vec![1.0, 2.0], vec![0.1, 0.2, 0.3]).unwrap_err();
    assert!(matches!(err, PropError::ShapeMismatch(_)));
}

#[test]
fn profile_shape_must_match_nominal() {
    let err = UncertainValue::from_profile(NumArray::scalar(1.0), UncertaintyProfile::empty(&[3]))
        .unwrap_err();
    assert_eq!(err.info().code, "profile-shape");
}

#[test]
fn adopting_complex_profile_widens_nominal() {
    let ctx = UncertaintyContext::default();
    let x = ctx.uncertain(2.0, 0.1).unwrap();
    let rotated = &x * &NumArray::from(Complex64::new(0.0, 1.0));

    let adopted = UncertainValue::from_profile(NumArray::scalar(1.0), rotated.profile().clone())
        .unwrap();
    assert_eq!(adopted.dtype(), DType::Complex128);
    assert_eq!(adopted.nominal(), &NumArray::from(Complex64::new(1.0, 0.0)));
    assert!((scalar_stddev(&adopted.imag()) - 0.1).abs() < 1e-12);
}

#[test]
fn assigning_complex_sensitivities_widens_nominal() {
    let ctx = UncertaintyContext::default();
    let mut a = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    let x = ctx.uncertain(0.0, 0.2).unwrap();
    let mut rotated = &x * &NumArray::from(Complex64::new(0.0, 1.0));
    rotated.update_nominal(|n| *n = n.real()).unwrap();
    assert_eq!(rotated.dtype(), DType::Float64);

    a.set(&Region::index(1), &Operand::from(rotated)).unwrap();
    assert_eq!(a.dtype(), DType::Complex128);
    let slot = a.get(&Region::index(1)).unwrap();
    assert_eq!(slot.sources(), x.sources());
    assert!((scalar_stddev(&slot.imag()) - 0.2).abs() < 1e-12);
}

#[test]
fn mismatched_shapes_are_reported() {
    let ctx = UncertaintyContext::default();
    let a = ctx.uncertain(vec![1.0, 2.0, 3.0], 0.1).unwrap();
    let b = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    let err = ufunc::ADD.apply(&a, &b).unwrap_err();
    assert!(matches!(err, PropError::ShapeMismatch(_)));
}

#[test]
#[should_panic(expected = "shape mismatch")]
fn operators_panic_on_mismatched_shapes() {
    let ctx = UncertaintyContext::default();
    let a = ctx.uncertain(vec![1.0, 2.0, 3.0], 0.1).unwrap();
    let b = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    let _ = &a * &b;
}

#[test]
fn region_assignment_rejects_unbroadcastable_operand() {
    let ctx = UncertaintyContext::default();
    let mut a = ctx.uncertain(vec![1.0, 2.0, 3.0, 4.0], 0.1).unwrap();
    let b = ctx.uncertain(vec![1.0, 2.0, 3.0], 0.1).unwrap();
    let nominal = a.nominal().clone();
    let sources = a.sources();

    let err = a.set(&Region::range(0, 2), &Operand::from(b)).unwrap_err();
    assert!(matches!(err, PropError::ShapeMismatch(_)));
    assert_eq!(a.nominal(), &nominal);
    assert_eq!(a.sources(), sources);
    assert!(a.stddev().unwrap().iter().all(|s| (s - 0.1).abs() < 1e-15));
}

#[test]
fn failed_complex_assignment_leaves_value_unchanged() {
    let ctx = UncertaintyContext::default();
    let mut a = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    let sources = a.sources();
    let incoming = NumArray::from(ArrayD::from_elem(IxDyn(&[3]), Complex64::new(0.0, 1.0)));

    let err = a.set(&Region::index(0), &Operand::from(incoming)).unwrap_err();
    assert!(matches!(err, PropError::ShapeMismatch(_)));
    assert_eq!(a.dtype(), DType::Float64);
    assert_eq!(a.sources(), sources);
}

#[test]
fn region_selection_errors() {
    let ctx = UncertaintyContext::default();
    let a = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    let err = a.get(&Region::index(5)).unwrap_err();
    assert_eq!(err.info().code, "index-out-of-bounds");
    let err = a.get(&Region::at(&[0, 0])).unwrap_err();
    assert_eq!(err.info().code, "region-rank");
    let last = a.get(&Region::index(-1)).unwrap();
    assert_eq!(last.to_scalar(), Some(2.0));
}

#[test]
fn complex_assignment_widens_nominal() {
    let ctx = UncertaintyContext::default();
    let mut a = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    assert_eq!(a.dtype(), DType::Float64);
    let incoming = NumArray::from(Complex64::new(0.0, 3.0));
    a.set(&Region::index(1), &Operand::from(incoming)).unwrap();
    assert_eq!(a.dtype(), DType::Complex128);
    let nominal = a.nominal().as_complex().unwrap();
    assert_eq!(nominal[IxDyn(&[0])], Complex64::new(1.0, 0.0));
    assert_eq!(nominal[IxDyn(&[1])], Complex64::new(0.0, 3.0));
}

#[test]
fn real_target_survives_real_valued_complex_data() {
    let ctx = UncertaintyContext::default();
    let mut a = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    let mut incoming = ctx.exact(NumArray::from(Complex64::new(5.0, 0.0)));
    incoming.update_nominal(|n| *n = n.real()).unwrap();
    a.set(&Region::index(0), &Operand::from(incoming)).unwrap();
    assert_eq!(a.dtype(), DType::Float64);
    assert_eq!(a.nominal(), &NumArray::from(vec![5.0, 2.0]));
}

#[test]
fn update_nominal_keeps_shape() {
    let ctx = UncertaintyContext::default();
    let mut a = ctx.uncertain(vec![1.0, 2.0], 0.1).unwrap();
    let err = a.update_nominal(|n| *n = NumArray::scalar(1.0)).unwrap_err();
    assert_eq!(err.info().code, "nominal-shape");
    assert_eq!(a.shape(), &[2]);
}

#[test]
fn shape_transforms_keep_sources_attached() {
    let ctx = UncertaintyContext::default();
    let grid = NumArray::from_shape_vec(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let a = ctx.uncertain(grid, 0.1).unwrap();

    let transposed = a.transpose(None).unwrap();
    assert_eq!(transposed.shape(), &[3, 2]);
    let original = a.get(&Region::at(&[0, 2])).unwrap();
    let moved = transposed.get(&Region::at(&[2, 0])).unwrap();
    assert_eq!(original.sources(), moved.sources());
    assert_eq!(original.to_scalar(), moved.to_scalar());

    let flat = a.reshape(&[6]).unwrap();
    assert_eq!(
        flat.get(&Region::index(5)).unwrap().sources(),
        a.get(&Region::at(&[1, 2])).unwrap().sources()
    );

    let repeated = flat.repeat(2, 0).unwrap();
    assert_eq!(repeated.shape(), &[12]);
    let first = repeated.get(&Region::index(0)).unwrap();
    let second = repeated.get(&Region::index(1)).unwrap();
    assert_eq!(scalar_stddev(&(&first - &second)), 0.0);

    let column = a.get(&Region::new(vec![AxisSlice::Full, AxisSlice::Index(1)])).unwrap();
    assert_eq!(column.nominal(), &NumArray::from(vec![2.0, 5.0]));
    assert_eq!(a.reshape(&[4]).unwrap_err().info().code, "reshape");
}

#[test]
fn broadcasting_keeps_element_sources_distinct() {
    let ctx = UncertaintyContext::default();
    let row = ctx.uncertain(vec![1.0, 2.0, 3.0], 0.1).unwrap();
    let grid = row.broadcast_to(&[2, 3]).unwrap();
    let record = &grid.profile().records()[0];
    assert_eq!(record.names().shape(), &[2, 3]);
    let names = record.names();
    assert_eq!(names[IxDyn(&[0, 1])], names[IxDyn(&[1, 1])]);
    assert_ne!(names[IxDyn(&[0, 0])], names[IxDyn(&[0, 1])]);
}

#[test]
fn real_and_imaginary_parts_split_sensitivities() {
    let ctx = UncertaintyContext::default();
    let x = ctx.uncertain(1.0, 0.1).unwrap();
    let z = &x * &NumArray::from(Complex64::new(3.0, 4.0));
    assert!((scalar_stddev(&z.real()) - 0.3).abs() < 1e-12);
    assert!((scalar_stddev(&z.imag()) - 0.4).abs() < 1e-12);
    assert_eq!(z.conjugate().imag().to_scalar(), Some(-4.0));
}
