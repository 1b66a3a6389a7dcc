use tb_core::errors::{ErrorInfo, TbError};
use tb_core::{from_json_slice, stable_hash_string, to_canonical_json_bytes, NumericDType};

#[test]
fn error_round_trips_through_json() {
    let err = TbError::Complexity(
        ErrorInfo::new("modifier.complex", "must not return complex values")
            .with_context("modifier", "mod()"),
    );
    let bytes = to_canonical_json_bytes(&err).expect("serialize");
    let decoded: TbError = from_json_slice(&bytes).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn dtype_serializes_to_conventional_names() {
    let json = serde_json::to_string(&NumericDType::Complex128).expect("serialize");
    assert_eq!(json, "\"complex128\"");
    let decoded: NumericDType = serde_json::from_str("\"float32\"").expect("deserialize");
    assert_eq!(decoded, NumericDType::Float32);
}

#[test]
fn stable_hash_ignores_field_insertion_order() {
    let a = serde_json::json!({"b": 1, "a": 2});
    let b = serde_json::json!({"a": 2, "b": 1});
    assert_eq!(stable_hash_string(&a).unwrap(), stable_hash_string(&b).unwrap());
}
