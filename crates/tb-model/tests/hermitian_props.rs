use num_complex::Complex64;
use proptest::prelude::*;
use tb_core::NumericDType;
use tb_lattice::repository::graphene;
use tb_lattice::Primitive;
use tb_model::Model;
use tb_modifier::{hopping_energy_modifier, onsite_energy_modifier, Signature};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn peierls_phases_keep_the_hamiltonian_hermitian(
        phase in -std::f64::consts::PI..std::f64::consts::PI,
        shift in -1.0f64..1.0,
        a1 in 1usize..5,
        a2 in 1usize..5,
    ) {
        let twist = hopping_energy_modifier(
            Signature::new("twist").arg("energy").bind("phase", phase),
            move |args| args.array(0)?.mul_complex(Complex64::from_polar(1.0, phase)),
        )
        .unwrap();
        let offset = onsite_energy_modifier(
            Signature::new("offset").arg("energy").bind("shift", shift),
            move |args| args.array(0)?.add_scalar(shift),
        )
        .unwrap();

        let system = Model::new(graphene::monolayer().unwrap())
            .with_primitive(Primitive::new(a1, a2, 1).unwrap())
            .with_modifier(twist)
            .with_modifier(offset)
            .build()
            .unwrap();
        let hamiltonian = system.hamiltonian();

        prop_assert_eq!(hamiltonian.dtype(), NumericDType::Complex64);
        prop_assert_eq!(hamiltonian.size(), 2 * a1 * a2);
        prop_assert_eq!(
            hamiltonian.nnz(),
            hamiltonian.size() + 2 * system.foundation().bonds().len()
        );
        prop_assert!(hamiltonian.is_hermitian(1e-5));
        for row in 0..hamiltonian.size() {
            prop_assert!((hamiltonian.get(row, row).re - shift).abs() < 1e-5);
        }
    }
}
