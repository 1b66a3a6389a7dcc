use tb_core::{derive_substream_seed, sample_uniform};

#[test]
fn substreams_are_reproducible_and_distinct() {
    assert_eq!(derive_substream_seed(7, 1), derive_substream_seed(7, 1));
    assert_ne!(derive_substream_seed(7, 1), derive_substream_seed(7, 2));

    let a = sample_uniform(7, 1, 16, 0.5, 1.5);
    let b = sample_uniform(7, 1, 16, 0.5, 1.5);
    assert_eq!(a, b);
    assert!(a.iter().all(|v| (0.5..1.5).contains(v)));
}
