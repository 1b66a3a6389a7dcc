use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_complex::Complex64;
use tb_lattice::repository::graphene;
use tb_lattice::Primitive;
use tb_model::Model;
use tb_modifier::{hopping_energy_modifier, onsite_energy_modifier, Signature};

fn bench_build(c: &mut Criterion) {
    let potential = onsite_energy_modifier(
        Signature::new("potential").args(["energy", "x", "y"]),
        |args| {
            let x = args.array(1)?.to_f64()?;
            let y = args.array(2)?.to_f64()?;
            let energy = args.array(0)?.to_f64()?;
            Ok(energy + &(&x * &x + &y * &y) * 0.05)
        },
    )
    .expect("potential");
    let field = hopping_energy_modifier(
        Signature::new("field").args(["energy", "x1", "x2"]),
        |args| {
            let x1 = args.array(1)?.to_f64()?;
            let x2 = args.array(2)?.to_f64()?;
            let phase = (&x1 - &x2) * 0.1;
            let factors = phase.mapv(|p| Complex64::from_polar(1.0, p));
            let energy = args.array(0)?.to_c64();
            Ok(energy * factors)
        },
    )
    .expect("field");

    let model = Model::new(graphene::monolayer().expect("graphene"))
        .with_primitive(Primitive::new(40, 40, 1).expect("primitive"))
        .with_modifier(potential)
        .with_modifier(field);

    c.bench_function("graphene_40x40_build", |b| {
        b.iter(|| {
            let system = model.build().expect("build");
            black_box(system.hamiltonian().nnz());
        });
    });
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
