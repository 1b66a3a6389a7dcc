use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use tb_core::{DynArray, IdArray, NumericDType};
use tb_modifier::{onsite_energy_modifier, Signature};

fn apply_bench(c: &mut Criterion) {
    let modifier = onsite_energy_modifier(
        Signature::new("potential").args(["energy", "x", "y"]),
        |args| {
            let x = args.array(1)?.to_f64()?;
            let y = args.array(2)?.to_f64()?;
            let energy = args.array(0)?.to_f64()?;
            Ok(DynArray::F64(energy + &(&x * &x + &y * &y) * 0.1))
        },
    )
    .unwrap();

    let len = 100_000;
    let coords = Array1::linspace(-5.0, 5.0, len);
    let full = vec![
        DynArray::zeros(NumericDType::Float32, len),
        DynArray::from_reals(NumericDType::Float32, coords.as_slice().unwrap()),
        DynArray::from_reals(NumericDType::Float32, coords.as_slice().unwrap()),
        DynArray::zeros(NumericDType::Float32, len),
        DynArray::Id(IdArray::permissive(Array1::zeros(len))),
    ];

    c.bench_function("onsite_apply_100k", |b| {
        b.iter(|| {
            let out = modifier.apply(&full).unwrap();
            black_box(out);
        });
    });
}

criterion_group!(benches, apply_bench);
criterion_main!(benches);
