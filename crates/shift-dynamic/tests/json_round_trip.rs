use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::Value as Json;
use shift_dynamic::{convert, JsonOps, Value, ValueOps};

fn json_value() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        any::<i64>().prop_map(Json::from),
        (-1_000_000_i32..1_000_000).prop_map(|n| Json::from(f64::from(n) / 4.0)),
        "[a-z ]{0,8}".prop_map(Json::from),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|entries| Json::Object(entries.into_iter().collect())),
        ]
    })
}

#[test]
fn wide_integers_stay_long() {
    let value = Value::from(serde_json::json!({"big": 5_000_000_000_i64, "small": 3}));
    assert_eq!(
        value,
        Value::map([
            ("big", Value::from(5_000_000_000_i64)),
            ("small", Value::from(3)),
        ])
    );
}

proptest! {
    #[test]
    fn prop_json_survives_canonical_tree(json in json_value()) {
        let value: Value = convert(&JsonOps, &ValueOps, &json);
        let back: Json = convert(&ValueOps, &JsonOps, &value);
        prop_assert_eq!(back, json);
    }

    #[test]
    fn prop_serde_text_round_trip(json in json_value()) {
        let value = Value::from(json);
        let text = serde_json::to_string(&value).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(parsed, value);
    }
}
