use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array1;
use num_complex::Complex64;
use tb_core::{DynArray, IdArray, NumericDType, TbError};
use tb_modifier::{
    hopping_energy_modifier, onsite_energy_modifier, onsite_energy_modifier_with,
    site_position_modifier, site_position_modifier_with, site_state_modifier, ModifierArgs,
    ModifierOptions, Quantity, Signature, PROBE_LEN,
};

#[test]
fn unexpected_argument_fails_before_any_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let err = site_state_modifier(Signature::new("bad").args(["state", "w"]), move |args| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(args.array(0)?.clone())
    })
    .unwrap_err();

    assert!(matches!(err, TbError::Signature(_)));
    assert!(err.info().message.contains("Unexpected argument"));
    assert_eq!(err.info().context["unexpected"], "w");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn every_unexpected_name_is_reported() {
    let err = onsite_energy_modifier(
        Signature::new("bad").args(["energy", "state", "hop_id"]),
        |args| Ok(args.array(0)?.clone()),
    )
    .unwrap_err();
    assert_eq!(err.info().context["unexpected"], "state,hop_id");
    assert!(err.info().hint.as_deref().unwrap_or("").contains("sub_id"));
}

#[test]
fn wrong_return_count_surfaces_at_registration() {
    let err = site_position_modifier(Signature::new("only_x").args(["x", "y", "z"]), |args| {
        Ok(args.array(0)?.clone())
    })
    .unwrap_err();
    assert!(matches!(err, TbError::ReturnCount(_)));
    assert!(err
        .info()
        .message
        .contains("expected to return 3 array(s), but got 1"));
    assert_eq!(err.info().context["kind"], "site-position");
}

#[test]
fn wrong_return_shape_surfaces_at_registration() {
    let err = onsite_energy_modifier(Signature::new("short").arg("energy"), |_args| {
        Ok(DynArray::zeros(NumericDType::Float32, 3))
    })
    .unwrap_err();
    assert!(matches!(err, TbError::ReturnShape(_)));
    assert!(err.info().message.contains("must return the same shape"));
}

#[test]
fn state_modifier_must_return_flags() {
    let err = site_state_modifier(Signature::new("numeric").arg("state"), |_args| {
        Ok(DynArray::zeros(NumericDType::Float32, PROBE_LEN))
    })
    .unwrap_err();
    assert!(matches!(err, TbError::ReturnType(_)));
}

fn phase(args: &ModifierArgs<'_>) -> Result<DynArray, TbError> {
    args.array_of(Quantity::Energy)?
        .mul_complex(Complex64::new(0.0, 1.0))
}

#[test]
fn onsite_complex_output_needs_the_complex_option() {
    let err = onsite_energy_modifier(Signature::new("phase").arg("energy"), phase).unwrap_err();
    assert!(matches!(err, TbError::Complexity(_)));
    assert!(err.info().message.contains("must not return complex"));

    let modifier = onsite_energy_modifier_with(ModifierOptions::default().complex(true))
        .wrap(Signature::new("phase").arg("energy"), phase)
        .unwrap();
    assert!(modifier.is_complex());
    assert!(!modifier.is_double());
}

#[test]
fn hopping_complexity_follows_the_registration_run() {
    let complex = hopping_energy_modifier(Signature::new("peierls").arg("energy"), |args| {
        args.array(0)?.mul_complex(Complex64::new(0.0, 1.0))
    })
    .unwrap();
    assert!(complex.is_complex());

    let real = hopping_energy_modifier(Signature::new("strain").arg("energy"), |args| {
        args.array(0)?.mul_scalar(0.5)
    })
    .unwrap();
    assert!(!real.is_complex());
}

#[test]
fn double_option_is_recorded_regardless_of_output() {
    let modifier = site_position_modifier_with(ModifierOptions::default().double(true))
        .wrap(Signature::new("f32_out").args(["x", "y", "z"]), |args| {
            let narrow = |index| -> Result<DynArray, TbError> {
                args.array(index)?.cast(NumericDType::Float32)
            };
            Ok((narrow(0)?, narrow(1)?, narrow(2)?))
        })
        .unwrap();
    assert!(modifier.is_double());
    assert!(!modifier.is_complex());
}

#[test]
fn non_finite_output_is_rejected_on_real_batches() {
    let modifier = onsite_energy_modifier(Signature::new("blowup").arg("energy"), |args| {
        args.array(0)?.map_real(|_| f64::INFINITY)
    })
    .unwrap();

    let energy = DynArray::from_reals(NumericDType::Float32, &[0.0, 0.0]);
    let mut full = vec![energy; 4];
    full.push(DynArray::Id(IdArray::permissive(Array1::zeros(2))));
    let err = modifier.apply(&full).unwrap_err();
    assert!(matches!(err, TbError::NonFinite(_)));
    assert_eq!(err.info().context["modifier"], "blowup()");
}

#[test]
fn errors_raised_by_the_body_carry_the_modifier_name() {
    let err = onsite_energy_modifier(Signature::new("boom").arg("energy"), |_args| {
        Err::<DynArray, _>(TbError::modifier("nope"))
    })
    .unwrap_err();
    assert!(matches!(err, TbError::Modifier(_)));
    assert_eq!(err.info().context["modifier"], "boom()");
    assert_eq!(err.info().context["kind"], "onsite-energy");
}

#[test]
fn registration_samples_are_deterministic_and_sized() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    for _ in 0..2 {
        let sink = Arc::clone(&seen);
        site_position_modifier(Signature::new("record").args(["x", "y", "z"]), move |args| {
            let x = args.array(0)?.to_f64()?;
            sink.lock().map_err(|_| TbError::modifier("poisoned"))?.push(x);
            Ok((
                args.array(0)?.clone(),
                args.array(1)?.clone(),
                args.array(2)?.clone(),
            ))
        })
        .unwrap();
    }
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].len(), PROBE_LEN);
    assert_eq!(seen[0], seen[1]);
    assert!(seen[0].iter().all(|v| (-1.0..1.0).contains(v)));
    let constant = Array1::from_elem(PROBE_LEN, seen[0][0]);
    assert_ne!(seen[0], constant);
}
