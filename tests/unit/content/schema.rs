use super::*;

use serde_json::json;

fn paragraph() -> SchemaNode {
    SchemaNode::String(StringRule {
        max_words: Some(5),
        max_length: Some(40),
        ..StringRule::default()
    })
}

fn line_items() -> SchemaNode {
    SchemaNode::Array {
        items: Box::new(SchemaNode::Object {
            properties: vec![
                ("description".into(), SchemaNode::String(StringRule::default())),
                (
                    "quantity".into(),
                    SchemaNode::Integer {
                        min: Some(1),
                        max: Some(20),
                    },
                ),
                ("note".into(), SchemaNode::String(StringRule::default())),
            ],
            required: vec!["description".into(), "quantity".into()],
        }),
        min_items: 1,
        max_items: Some(3),
    }
}

#[test]
fn envelope_round_trip_and_failures() {
    assert_eq!(parse_envelope(&wrap_envelope(json!([1, 2]))).unwrap(), json!([1, 2]));
    assert!(parse_envelope("nope").unwrap_err().reason.starts_with("malformed JSON"));
    assert_eq!(parse_envelope("{}").unwrap_err().reason, "missing `value` field");
    assert!(parse_envelope("[1]").unwrap_err().reason.contains("expected an object"));
}

#[test]
fn string_limits_and_banned_patterns() {
    let banned = vec![BannedPattern::new("(?i)lorem").unwrap()];
    assert!(validate(&json!("one two three"), &paragraph(), &banned).is_ok());
    let err = validate(&json!("a b c d e f"), &paragraph(), &banned).unwrap_err();
    assert_eq!(err.to_string(), "$: expected at most 5 words, got 6");
    let err = validate(&json!("Lorem ipsum"), &paragraph(), &banned).unwrap_err();
    assert!(err.reason.contains("banned pattern"));
    let err = validate(&json!(3), &paragraph(), &banned).unwrap_err();
    assert_eq!(err.reason, "expected string, got number");
}

#[test]
fn nested_paths_point_at_the_offender() {
    let ok = json!([{"description": "Widget", "quantity": 2}]);
    assert!(validate(&ok, &line_items(), &[]).is_ok());

    let with_null = json!([{"description": "Widget", "quantity": 2, "note": null}]);
    assert!(validate(&with_null, &line_items(), &[]).is_ok());

    let bad_qty = json!([
        {"description": "a", "quantity": 1},
        {"description": "b", "quantity": 30}
    ]);
    assert_eq!(
        validate(&bad_qty, &line_items(), &[]).unwrap_err().to_string(),
        "$[1].quantity: expected <= 20, got 30"
    );

    let missing = json!([{"quantity": 1}]);
    assert_eq!(
        validate(&missing, &line_items(), &[]).unwrap_err().path,
        "$[0].description"
    );

    let extra = json!([{"description": "a", "quantity": 1, "price": 3}]);
    assert!(validate(&extra, &line_items(), &[]).unwrap_err().reason.contains("price"));

    let too_many = json!([
        {"description": "a", "quantity": 1},
        {"description": "a", "quantity": 1},
        {"description": "a", "quantity": 1},
        {"description": "a", "quantity": 1}
    ]);
    assert_eq!(
        validate(&too_many, &line_items(), &[]).unwrap_err().reason,
        "expected at most 3 items, got 4"
    );
}

#[test]
fn enums_integers_and_booleans() {
    let e = SchemaNode::Enum(vec!["paid".into(), "due".into()]);
    assert!(validate(&json!("due"), &e, &[]).is_ok());
    assert!(validate(&json!("late"), &e, &[]).is_err());
    let i = SchemaNode::Integer { min: None, max: None };
    assert!(validate(&json!(2.5), &i, &[]).is_err());
    assert!(validate(&json!(true), &SchemaNode::Boolean, &[]).is_ok());
}

#[test]
fn json_schema_export() {
    let s = to_json_schema(&line_items());
    assert_eq!(s["type"], "array");
    assert_eq!(s["maxItems"], 3);
    let item = &s["items"];
    assert_eq!(item["additionalProperties"], false);
    assert_eq!(item["required"], json!(["description", "quantity", "note"]));
    assert_eq!(item["properties"]["quantity"]["minimum"], 1);
    assert!(item["properties"]["note"]["anyOf"].is_array());

    let p = to_json_schema(&paragraph());
    assert_eq!(p["maxLength"], 40);
    assert_eq!(p["description"], "at most 5 words");

    let env = envelope_schema(&SchemaNode::Boolean);
    assert_eq!(env["properties"]["value"]["type"], "boolean");
}
