use super::*;

use crate::content::schema::word_count;

fn string(rule: StringRule) -> SchemaNode {
    SchemaNode::String(rule)
}

#[test]
fn synthesized_content_is_valid_and_seeded() {
    let node = SchemaNode::Array {
        items: Box::new(SchemaNode::Object {
            properties: vec![
                (
                    "description".into(),
                    string(StringRule {
                        max_length: Some(30),
                        ..StringRule::default()
                    }),
                ),
                (
                    "quantity".into(),
                    SchemaNode::Integer {
                        min: Some(1),
                        max: Some(20),
                    },
                ),
                ("price".into(), SchemaNode::Number { min: Some(0.5), max: Some(99.0) }),
                ("status".into(), SchemaNode::Enum(vec!["paid".into(), "due".into()])),
                ("urgent".into(), SchemaNode::Boolean),
            ],
            required: vec!["description".into(), "quantity".into()],
        }),
        min_items: 2,
        max_items: Some(6),
    };
    for seed in 0..50 {
        let v = synthesize(&node, seed, &[], None).unwrap();
        validate(&v, &node, &[]).unwrap();
        assert_eq!(v, synthesize(&node, seed, &[], None).unwrap());
    }
    assert_ne!(
        synthesize(&node, 1, &[], None).unwrap(),
        synthesize(&node, 2, &[], None).unwrap()
    );
}

#[test]
fn word_limits_are_honored() {
    let node = string(StringRule {
        min_words: Some(8),
        max_words: Some(50),
        ..StringRule::default()
    });
    for seed in 0..50 {
        let v = synthesize(&node, seed, &[], None).unwrap();
        let n = word_count(v.as_str().unwrap());
        assert!((8..=50).contains(&n), "{n}");
    }
}

#[test]
fn banned_patterns_force_the_safe_default() {
    // Bans every corpus sentence (they all end with a period).
    let banned = vec![BannedPattern::new(r"\.").unwrap()];
    let node = string(StringRule {
        min_words: Some(2),
        ..StringRule::default()
    });
    let v = synthesize(&node, 7, &banned, None).unwrap();
    assert_eq!(v, serde_json::json!("data data"));
}

#[test]
fn safe_default_is_minimal() {
    let node = string(StringRule {
        min_length: Some(10),
        max_words: Some(1),
        ..StringRule::default()
    });
    assert_eq!(safe_default(&node, &[]).unwrap(), serde_json::json!("dataxxxxxx"));
    assert_eq!(
        safe_default(&SchemaNode::Integer { min: Some(3), max: None }, &[]).unwrap(),
        serde_json::json!(3)
    );
    assert_eq!(
        safe_default(&SchemaNode::Number { min: None, max: Some(-2.0) }, &[]).unwrap(),
        serde_json::json!(-2.0)
    );
}

#[test]
fn impossible_schemas_are_reported() {
    let contradictory = string(StringRule {
        min_words: Some(10),
        max_length: Some(5),
        ..StringRule::default()
    });
    assert!(safe_default(&contradictory, &[]).is_err());

    let everything = vec![BannedPattern::new(".").unwrap()];
    assert!(safe_default(&SchemaNode::Enum(vec!["a".into()]), &everything).is_err());
}

#[test]
fn provider_wraps_content_in_envelope() {
    use crate::content::provider::Message;
    use crate::content::schema::parse_envelope;

    let node = SchemaNode::Boolean;
    let request = ContentRequest {
        slot: "flag",
        block_id: "b",
        schema: &node,
        banned: &[],
        messages: Vec::<Message>::new(),
        seed: 1,
        attempt: 1,
        cancel: None,
    };
    let raw = FallbackProvider.generate(&request).unwrap();
    assert!(parse_envelope(&raw).unwrap().is_boolean());
    assert_eq!(FallbackProvider.identity().kind, "fallback");
}
