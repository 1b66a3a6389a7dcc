use std::collections::BTreeSet;

use ndarray::Array1;
use proptest::prelude::*;
use tb_lattice::repository::graphene;
use tb_lattice::{Foundation, Primitive};

fn block(n: usize) -> Foundation {
    let lattice = graphene::monolayer().unwrap();
    Foundation::new(&lattice, Primitive::new(n, n, 1).unwrap()).unwrap()
}

fn adjacency(foundation: &Foundation) -> Vec<BTreeSet<usize>> {
    let mut adjacency = vec![BTreeSet::new(); foundation.num_sites()];
    for bond in foundation.bonds() {
        adjacency[bond.from].insert(bond.to);
        adjacency[bond.to].insert(bond.from);
    }
    adjacency
}

#[test]
fn nothing_is_trimmed_when_every_site_is_valid() {
    let mut foundation = block(1);
    assert_eq!(foundation.trim_dangling(2), 0);
    assert_eq!(foundation.num_valid(), 2);
}

#[test]
fn removing_one_site_of_a_dimer_removes_both() {
    let mut foundation = block(1);
    foundation
        .set_valid(Array1::from_vec(vec![true, false]))
        .unwrap();
    assert_eq!(foundation.trim_dangling(2), 1);
    assert_eq!(foundation.num_valid(), 0);
}

#[test]
fn interior_vacancy_leaves_neighbours_with_two_bonds() {
    let mut foundation = block(3);
    let mut valid = Array1::from_elem(foundation.num_sites(), true);
    let centre = foundation.site_index([1, 1, 0], 0);
    valid[centre] = false;
    foundation.set_valid(valid).unwrap();

    assert_eq!(foundation.trim_dangling(2), 0);
    assert_eq!(foundation.num_valid(), 17);
}

#[test]
fn wrong_length_masks_are_rejected() {
    let mut foundation = block(2);
    let err = foundation
        .set_valid(Array1::from_elem(3, true))
        .unwrap_err();
    assert_eq!(err.info().code, "lattice.length-mismatch");
}

proptest! {
    #[test]
    fn trimmed_sites_next_to_vacancies_keep_enough_neighbours(
        mask in prop::collection::vec(prop::bool::weighted(0.85), 32),
    ) {
        let mut foundation = block(4);
        let full = adjacency(&foundation);
        foundation.set_valid(Array1::from_vec(mask)).unwrap();
        foundation.trim_dangling(2);

        let valid = foundation.is_valid().clone();
        for site in 0..foundation.num_sites() {
            if !valid[site] {
                continue;
            }
            let alive = full[site].iter().filter(|n| valid[**n]).count();
            if alive < full[site].len() {
                prop_assert!(alive >= 2, "site {} kept with {} neighbours", site, alive);
            }
        }
        prop_assert_eq!(foundation.trim_dangling(2), 0);
    }
}
