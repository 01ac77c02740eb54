use super::*;

#[test]
fn provider_yaml_defaults_and_validation() {
    let cfg = ProviderConfig::from_yaml_str("kind: openai\nmodel: gpt-4o\n").unwrap();
    assert_eq!(cfg.kind, ProviderKind::Openai);
    assert_eq!(cfg.model, "gpt-4o");
    assert_eq!(cfg.repair_attempts, 2);
    assert_eq!(cfg.api_key_env, "OPENAI_API_KEY");

    assert!(ProviderConfig::from_yaml_str("kind: openai\ntemprature: 1\n").is_err());
    assert!(ProviderConfig::from_yaml_str("kind: openai\ntop_p: 0\n").is_err());
    assert!(ProviderConfig::from_yaml_str("kind: bogus\n").is_err());
}

#[test]
fn config_hash_tracks_settings_but_not_secrets() {
    let a = ProviderConfig::default();
    let mut b = a.clone();
    assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
    b.temperature = 0.1;
    assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    let yaml = serde_yaml::to_string(&a).unwrap();
    assert!(yaml.contains("api_key_env"));
    assert!(!yaml.contains("sk-"));
}

#[test]
fn transient_classification() {
    assert!(ProviderError::Timeout("t".into()).is_transient());
    assert!(ProviderError::Connection("c".into()).is_transient());
    assert!(ProviderError::Status { status: 429, body: String::new() }.is_transient());
    assert!(ProviderError::Status { status: 502, body: String::new() }.is_transient());
    assert!(!ProviderError::Status { status: 401, body: String::new() }.is_transient());
    assert!(!ProviderError::Malformed("m".into()).is_transient());
}

#[test]
fn create_provider_by_kind() {
    let p = create_provider(&ProviderConfig::default()).unwrap();
    assert_eq!(p.identity().kind, "fallback");

    let cfg = ProviderConfig {
        kind: ProviderKind::Openai,
        api_key_env: "DOCSYNTH_TEST_KEY_THAT_IS_NOT_SET".into(),
        ..ProviderConfig::default()
    };
    let err = match create_provider(&cfg) {
        Ok(_) => panic!("missing key must fail"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("DOCSYNTH_TEST_KEY_THAT_IS_NOT_SET"));
}
