use proptest::prelude::*;
use tb_core::{DynArray, TbError};
use tb_modifier::{
    Decorator, ModifierArgs, ModifierKind, ModifierOptions, Quantity, Signature, Sites,
    SpatialIndex,
};

const KINDS: [ModifierKind; 4] = [
    ModifierKind::OnsiteEnergy,
    ModifierKind::HoppingEnergy,
    ModifierKind::SitePosition,
    ModifierKind::SiteState,
];

fn passthrough(kind: ModifierKind) -> impl Fn(&ModifierArgs<'_>) -> Result<Vec<DynArray>, TbError> {
    move |args| {
        kind.replaces()
            .iter()
            .map(|quantity| args.array_of(*quantity).cloned())
            .collect()
    }
}

/// Declared names: the replaced quantities plus the vocabulary entries picked by `mask`.
fn declared(kind: ModifierKind, mask: u32) -> Vec<&'static str> {
    kind.vocabulary()
        .iter()
        .enumerate()
        .filter(|(bit, quantity)| kind.replaces().contains(*quantity) || mask & (1 << *bit) != 0)
        .map(|(_, quantity)| quantity.name())
        .collect()
}

proptest! {
    #[test]
    fn any_vocabulary_subset_registers(kind_index in 0usize..4, mask in any::<u32>()) {
        let kind = KINDS[kind_index];
        let names = declared(kind, mask);
        let modifier = Decorator::new(kind, ModifierOptions::default())
            .wrap(Signature::new("subset").args(names.iter().copied()), passthrough(kind))
            .unwrap();
        let requested: Vec<&str> = modifier.requested().iter().map(|q| q.name()).collect();
        prop_assert_eq!(requested, names);
        prop_assert_eq!(modifier.needs_sites(), modifier.requested().contains(&Quantity::Sites));
    }

    #[test]
    fn unknown_names_are_reported(kind_index in 0usize..4, extra in "[a-w]{3,8}") {
        let kind = KINDS[kind_index];
        prop_assume!(Quantity::from_name(&extra).is_none());
        let mut names: Vec<String> = declared(kind, 0).into_iter().map(String::from).collect();
        names.push(extra.clone());
        let err = Decorator::new(kind, ModifierOptions::default())
            .wrap(Signature::new("bad").args(names), passthrough(kind))
            .unwrap_err();
        prop_assert!(matches!(err, TbError::Signature(_)));
        prop_assert_eq!(&err.info().context["unexpected"], &extra);
    }

    #[test]
    fn argsort_nearest_orders_by_distance(
        points in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0), 1..30),
        reference in (-10.0f64..10.0, -10.0f64..10.0),
    ) {
        let x = points.iter().map(|p| p.0).collect();
        let y = points.iter().map(|p| p.1).collect();
        let z = points.iter().map(|p| p.2).collect();
        let sites = Sites::new(x, y, z).unwrap();
        let order = sites.argsort_nearest(&[reference.0, reference.1]);

        let mut sorted = order.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..points.len()).collect::<Vec<_>>());

        let distance = |i: usize| {
            let (px, py, pz) = points[i];
            let dx = px - reference.0;
            let dy = py - reference.1;
            dx * dx + dy * dy + pz * pz
        };
        for pair in order.windows(2) {
            prop_assert!(distance(pair[0]) <= distance(pair[1]));
        }
    }
}
