use tb_lattice::repository::graphene;
use tb_lattice::{Foundation, HamiltonianIndices, Primitive};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn single_cell_has_two_sites_on_the_y_axis() {
    let lattice = graphene::monolayer().unwrap();
    let foundation = Foundation::new(&lattice, Primitive::default()).unwrap();

    assert_eq!(foundation.num_sites(), 2);
    assert!(foundation.x().iter().all(|x| close(*x, 0.0)));
    assert!(close(foundation.y()[0], -graphene::A_CC / 2.0));
    assert!(close(foundation.y()[1], graphene::A_CC / 2.0));
    assert!(foundation.z().iter().all(|z| close(*z, 0.0)));
    assert_eq!(foundation.raw_sub_ids().to_vec(), vec![0, 1]);
}

#[test]
fn sublattice_ids_resolve_names() {
    let lattice = graphene::monolayer().unwrap();
    let foundation = Foundation::new(&lattice, Primitive::default()).unwrap();
    let sub_id = foundation.sub_ids();

    assert_eq!(lattice.sub_id("A").unwrap(), 0);
    assert_eq!(sub_id.eq_id(lattice.sub_id("A").unwrap()).to_vec(), vec![true, false]);
    assert_eq!(sub_id.eq_name("A").unwrap().to_vec(), vec![true, false]);
    assert_eq!(sub_id.ne_name("A").unwrap().to_vec(), vec![false, true]);
    let err = sub_id.eq_name("invalid_sublattice_name").unwrap_err();
    assert_eq!(err.info().code, "lattice.unknown-name");

    assert_eq!(lattice.hop_id("t").unwrap(), 0);
    assert!(lattice.hop_id("invalid_hopping_name").is_err());
}

#[test]
fn single_cell_keeps_only_the_intra_cell_bond() {
    let lattice = graphene::monolayer().unwrap();
    let foundation = Foundation::new(&lattice, Primitive::default()).unwrap();
    let bonds = foundation.bonds();
    assert_eq!(bonds.len(), 1);
    assert_eq!((bonds[0].from, bonds[0].to, bonds[0].hop_id), (0, 1, 0));
    assert_eq!(lattice.hopping_energy(0), Some(graphene::T));
}

#[test]
fn every_bond_spans_the_carbon_distance() {
    let lattice = graphene::monolayer().unwrap();
    let foundation = Foundation::new(&lattice, Primitive::new(4, 4, 1).unwrap()).unwrap();
    let (x, y, z) = (foundation.x(), foundation.y(), foundation.z());

    let bonds = foundation.bonds();
    // Intra-cell bonds, then the [1, -1] and [0, -1] terms that stay inside.
    assert_eq!(bonds.len(), 16 + 9 + 12);
    for bond in &bonds {
        let d = ((x[bond.from] - x[bond.to]).powi(2)
            + (y[bond.from] - y[bond.to]).powi(2)
            + (z[bond.from] - z[bond.to]).powi(2))
        .sqrt();
        assert!((d - graphene::A_CC).abs() < 1e-3, "bond length {d}");
    }

    let counts = foundation.count_neighbors();
    assert_eq!(counts.iter().copied().max(), Some(3));
    assert_eq!(HamiltonianIndices::new(&foundation).num_valid(), 32);
}
