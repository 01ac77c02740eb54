use super::*;

use std::sync::Mutex;

use crate::content::provider::{ProviderError, ProviderIdentity};
use crate::content::schema::{word_count, wrap_envelope};

const RULESET: &str = "\
system_prompt: Write business prose.
banned_patterns: ['(?i)lorem']
schemas:
  paragraph: {type: string, min_words: 5, max_words: 50}
  flag: {type: boolean}
";

/// Replays scripted results and records every request.
struct Scripted {
    script: Mutex<Vec<Result<String, ProviderError>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl Scripted {
    fn new(mut script: Vec<Result<String, ProviderError>>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl ContentProvider for Scripted {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity {
            kind: "scripted".into(),
            model: "test".into(),
        }
    }

    fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError> {
        self.seen.lock().unwrap().push(request.messages.clone());
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(ProviderError::Timeout("script exhausted".into())))
    }
}

fn ruleset() -> ContentRuleset {
    ContentRuleset::from_yaml_str(RULESET).unwrap()
}

fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

fn req(slot: &str) -> SlotRequest<'_> {
    SlotRequest {
        slot,
        block_id: "body[0]",
        prompt: Some("Summarize the quarter."),
        document: "report",
        sample_seed: 42,
    }
}

#[test]
fn transition_table() {
    use EnforcerEvent as E;
    use EnforcerState as S;
    assert_eq!(transition(S::Requested, E::Response, 2), Some(S::Validating));
    assert_eq!(transition(S::Validating, E::Valid, 0), Some(S::Done));
    assert_eq!(transition(S::Validating, E::Invalid, 1), Some(S::RepairRequested));
    assert_eq!(transition(S::Validating, E::Invalid, 0), Some(S::Exhausted));
    assert_eq!(transition(S::RepairRequested, E::Response, 0), Some(S::Validating));
    assert_eq!(transition(S::Requested, E::ProviderFailed, 1), Some(S::Requested));
    assert_eq!(transition(S::RepairRequested, E::ProviderFailed, 0), Some(S::Exhausted));
    assert_eq!(transition(S::Requested, E::Cancelled, 5), Some(S::Exhausted));
    assert_eq!(transition(S::Exhausted, E::FallbackStarted, 0), Some(S::Fallback));
    assert_eq!(transition(S::Fallback, E::FallbackProduced, 0), Some(S::Done));
    assert_eq!(transition(S::Done, E::Response, 2), None);
    assert_eq!(transition(S::Validating, E::Response, 2), None);
}

#[test]
fn valid_first_response_is_accepted() {
    let rs = ruleset();
    let provider = Scripted::new(vec![Ok(wrap_envelope(serde_json::json!(words(10))))]);
    let enforcer = Enforcer::new(&provider, &rs, EnforcerPolicy::default(), None);
    let out = enforcer.resolve(req("paragraph")).unwrap();
    assert_eq!(out.origin, ContentOrigin::Provider);
    assert_eq!(out.attempts, 1);
    assert_eq!(out.value, serde_json::json!(words(10)));
    assert!(out.failures.is_empty());
}

#[test]
fn overlong_paragraph_is_repaired_then_falls_back() {
    let rs = ruleset();
    let long = wrap_envelope(serde_json::json!(words(200)));
    let provider = Scripted::new(vec![Ok(long.clone()), Ok(long.clone()), Ok(long)]);
    let enforcer = Enforcer::new(&provider, &rs, EnforcerPolicy::default(), None);
    let out = enforcer.resolve(req("paragraph")).unwrap();

    assert_eq!(provider.calls(), 3);
    assert_eq!(out.attempts, 3);
    assert_eq!(out.origin, ContentOrigin::Fallback);
    let text = out.value.as_str().unwrap();
    assert!(word_count(text) <= 50 && word_count(text) >= 5, "{text}");
    assert_eq!(out.failures.len(), 3);
    assert!(out.failures[0].contains("at most 50 words, got 200"));

    let seen = provider.seen.lock().unwrap();
    let repair = seen[1].last().unwrap();
    assert_eq!(repair.role, Role::User);
    assert!(repair.content.contains("rejected"));
    assert!(repair.content.contains("\"value\""));
}

#[test]
fn repair_can_succeed() {
    let rs = ruleset();
    let provider = Scripted::new(vec![
        Ok(wrap_envelope(serde_json::json!(words(200)))),
        Ok(wrap_envelope(serde_json::json!(words(20)))),
    ]);
    let enforcer = Enforcer::new(&provider, &rs, EnforcerPolicy::default(), None);
    let out = enforcer.resolve(req("paragraph")).unwrap();
    assert_eq!(out.origin, ContentOrigin::Provider);
    assert_eq!(out.attempts, 2);
}

#[test]
fn every_failure_mode_terminates_with_valid_content() {
    let rs = ruleset();
    let schema = rs.schema("paragraph").unwrap();
    let modes: Vec<Vec<Result<String, ProviderError>>> = vec![
        vec![],
        vec![Ok("not json".into()); 3],
        vec![Ok("{\"other\": 1}".into()); 3],
        vec![Ok(wrap_envelope(serde_json::json!(42))); 3],
        vec![Ok(wrap_envelope(serde_json::json!("lorem ipsum dolor sit amet"))); 3],
        vec![
            Err(ProviderError::Connection("refused".into())),
            Err(ProviderError::Status {
                status: 500,
                body: String::new(),
            }),
            Ok("{".into()),
        ],
    ];
    for script in modes {
        let provider = Scripted::new(script);
        let enforcer = Enforcer::new(&provider, &rs, EnforcerPolicy::default(), None);
        let out = enforcer.resolve(req("paragraph")).unwrap();
        assert_eq!(out.origin, ContentOrigin::Fallback);
        assert!(out.attempts <= 3);
        validate(&out.value, schema, &rs.banned_patterns).unwrap();
    }
}

#[test]
fn fallback_is_deterministic_per_block() {
    let rs = ruleset();
    let resolve = |block: &str| {
        let provider = Scripted::new(vec![]);
        let enforcer = Enforcer::new(&provider, &rs, EnforcerPolicy { repair_attempts: 0 }, None);
        let mut r = req("paragraph");
        r.block_id = block;
        enforcer.resolve(r).unwrap().value
    };
    assert_eq!(resolve("body[0]"), resolve("body[0]"));
    assert_ne!(resolve("body[0]"), resolve("body[1]"));
}

#[test]
fn cancellation_skips_provider_calls() {
    let rs = ruleset();
    let cancel = CancelToken::new();
    cancel.cancel();
    let provider = Scripted::new(vec![Ok(wrap_envelope(serde_json::json!(true)))]);
    let enforcer = Enforcer::new(&provider, &rs, EnforcerPolicy::default(), Some(&cancel));
    let out = enforcer.resolve(req("flag")).unwrap();
    assert_eq!(provider.calls(), 0);
    assert_eq!(out.origin, ContentOrigin::Fallback);
    assert!(out.value.is_boolean());
}

#[test]
fn unknown_slot_is_an_error() {
    let rs = ruleset();
    let provider = Scripted::new(vec![]);
    let enforcer = Enforcer::new(&provider, &rs, EnforcerPolicy::default(), None);
    let err = enforcer.resolve(req("missing")).unwrap_err();
    assert_eq!(err.class(), "SchemaViolationError");
}
