use std::collections::HashMap;

use nest_config::{from_json_slice, to_canonical_json_bytes};

#[test]
fn canonical_json_sorts_nested_keys() {
    let mut inner = HashMap::new();
    inner.insert("zeta", 1);
    inner.insert("alpha", 2);
    let mut outer = HashMap::new();
    outer.insert("b", vec![inner.clone()]);
    outer.insert("a", vec![inner]);
    let bytes = to_canonical_json_bytes(&outer).expect("encode");
    assert_eq!(
        String::from_utf8(bytes).expect("utf8"),
        r#"{"a":[{"alpha":2,"zeta":1}],"b":[{"alpha":2,"zeta":1}]}"#
    );
}

#[test]
fn invalid_json_is_a_serde_error() {
    let err = from_json_slice::<Vec<u32>>(b"[1, 2").unwrap_err();
    assert_eq!(err.info().code, "json_deserialize");
}
