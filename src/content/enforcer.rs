//! Structured-output enforcement: request, validate, repair, then fall back.
//!
//! [`transition`] is the whole state machine as a pure function; [`Enforcer`] drives it against a
//! provider. Provider-side failures never leave this module as errors.

use serde_json::Value;

use crate::content::fallback;
use crate::content::provider::{ContentProvider, ContentRequest, Message, Role};
use crate::content::schema::{envelope_schema, parse_envelope, validate};
use crate::foundation::error::{SynthError, SynthResult};
use crate::foundation::math::stable_hash64;
use crate::layout::block::ContentOrigin;
use crate::pipeline::cancel::CancelToken;
use crate::spec::ruleset::ContentRuleset;

const RAW_EXCERPT: usize = 2_000;

/// Enforcer states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnforcerState {
    /// Initial request pending.
    Requested,
    /// A response is being checked.
    Validating,
    /// A repair (or retry) request is pending.
    RepairRequested,
    /// Budget spent.
    Exhausted,
    /// Deterministic fallback running.
    Fallback,
    /// Content accepted.
    Done,
}

/// Inputs to the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnforcerEvent {
    /// The provider answered.
    Response,
    /// The provider failed (timeout, transport, HTTP status).
    ProviderFailed,
    /// Cancellation was observed before a provider call.
    Cancelled,
    /// The response conforms.
    Valid,
    /// The response does not conform.
    Invalid,
    /// Fallback generation started.
    FallbackStarted,
    /// Fallback content was produced.
    FallbackProduced,
}

/// Next state, or `None` when `event` cannot happen in `state`.
pub fn transition(
    state: EnforcerState,
    event: EnforcerEvent,
    repairs_left: u32,
) -> Option<EnforcerState> {
    use EnforcerEvent as E;
    use EnforcerState as S;
    let next = match (state, event) {
        (S::Requested | S::RepairRequested, E::Response) => S::Validating,
        (S::Requested | S::RepairRequested, E::ProviderFailed) if repairs_left > 0 => state,
        (S::Requested | S::RepairRequested, E::ProviderFailed | E::Cancelled) => S::Exhausted,
        (S::Validating, E::Valid) => S::Done,
        (S::Validating, E::Invalid) if repairs_left > 0 => S::RepairRequested,
        (S::Validating, E::Invalid) => S::Exhausted,
        (S::Exhausted, E::FallbackStarted) => S::Fallback,
        (S::Fallback, E::FallbackProduced) => S::Done,
        _ => return None,
    };
    Some(next)
}

/// Repair budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnforcerPolicy {
    /// Extra provider calls after the first (repairs or retries).
    pub repair_attempts: u32,
}

impl Default for EnforcerPolicy {
    fn default() -> Self {
        Self { repair_attempts: 2 }
    }
}

/// Accepted content for one slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotOutcome {
    pub value: Value,
    pub origin: ContentOrigin,
    pub attempts: u32,
    pub failures: Vec<String>,
}

/// One slot to fill.
#[derive(Clone, Copy, Debug)]
pub struct SlotRequest<'a> {
    pub slot: &'a str,
    pub block_id: &'a str,
    pub prompt: Option<&'a str>,
    pub document: &'a str,
    pub sample_seed: u64,
}

/// Drives [`transition`] against a provider.
pub struct Enforcer<'a> {
    provider: &'a dyn ContentProvider,
    ruleset: &'a ContentRuleset,
    policy: EnforcerPolicy,
    cancel: Option<&'a CancelToken>,
}

impl<'a> Enforcer<'a> {
    /// Create an enforcer.
    pub fn new(
        provider: &'a dyn ContentProvider,
        ruleset: &'a ContentRuleset,
        policy: EnforcerPolicy,
        cancel: Option<&'a CancelToken>,
    ) -> Self {
        Self {
            provider,
            ruleset,
            policy,
            cancel,
        }
    }

    /// Produce schema-valid content for a slot.
    ///
    /// Only fails for a slot missing from the ruleset, which validated spec sets rule out.
    #[tracing::instrument(skip(self, req), fields(slot = req.slot, block = req.block_id))]
    pub fn resolve(&self, req: SlotRequest<'_>) -> SynthResult<SlotOutcome> {
        let schema = self
            .ruleset
            .schema(req.slot)
            .ok_or_else(|| SynthError::schema(format!("unknown content slot `{}`", req.slot)))?;
        let seed = stable_hash64(req.sample_seed, req.block_id);
        let schema_text = envelope_schema(schema).to_string();

        let mut messages = vec![
            Message::new(Role::System, self.system_prompt(&schema_text)),
            Message::new(Role::User, user_prompt(&req)),
        ];
        let mut state = EnforcerState::Requested;
        let mut repairs_left = self.policy.repair_attempts;
        let mut attempts = 0u32;
        let mut failures = Vec::new();
        let mut raw = String::new();
        let mut accepted: Option<(Value, ContentOrigin)> = None;

        while state != EnforcerState::Done {
            let event = match state {
                EnforcerState::Requested | EnforcerState::RepairRequested => {
                    if self.cancel.is_some_and(CancelToken::is_cancelled) {
                        failures.push("cancelled".to_owned());
                        EnforcerEvent::Cancelled
                    } else {
                        attempts += 1;
                        let request = ContentRequest {
                            slot: req.slot,
                            block_id: req.block_id,
                            schema,
                            banned: &self.ruleset.banned_patterns,
                            messages: messages.clone(),
                            seed,
                            attempt: attempts,
                            cancel: self.cancel,
                        };
                        match self.provider.generate(&request) {
                            Ok(text) => {
                                raw = text;
                                EnforcerEvent::Response
                            }
                            Err(e) => {
                                tracing::debug!(
                                    attempt = attempts,
                                    error = %e,
                                    "provider call failed"
                                );
                                failures.push(e.to_string());
                                EnforcerEvent::ProviderFailed
                            }
                        }
                    }
                }
                EnforcerState::Validating => {
                    let banned = &self.ruleset.banned_patterns;
                    let checked =
                        parse_envelope(&raw).and_then(|v| validate(&v, schema, banned).map(|()| v));
                    match checked {
                        Ok(v) => {
                            accepted = Some((v, ContentOrigin::Provider));
                            EnforcerEvent::Valid
                        }
                        Err(violation) => {
                            tracing::debug!(attempt = attempts, %violation, "response rejected");
                            failures.push(violation.to_string());
                            let excerpt: String = raw.chars().take(RAW_EXCERPT).collect();
                            messages.push(Message::new(Role::Assistant, excerpt));
                            messages.push(Message::new(
                                Role::User,
                                format!(
                                    "Your previous answer was rejected: {violation}. Reply again \
                                     with JSON that matches this schema exactly: {schema_text}"
                                ),
                            ));
                            EnforcerEvent::Invalid
                        }
                    }
                }
                EnforcerState::Exhausted => {
                    tracing::warn!(
                        attempts,
                        last = failures.last().map(String::as_str).unwrap_or(""),
                        "content budget exhausted, using fallback"
                    );
                    EnforcerEvent::FallbackStarted
                }
                EnforcerState::Fallback => {
                    let v = fallback::synthesize(
                        schema,
                        seed,
                        &self.ruleset.banned_patterns,
                        self.ruleset.safe_default(req.slot),
                    )
                    .map_err(SynthError::schema)?;
                    accepted = Some((v, ContentOrigin::Fallback));
                    EnforcerEvent::FallbackProduced
                }
                EnforcerState::Done => break,
            };

            let Some(next) = transition(state, event, repairs_left) else {
                return Err(SynthError::schema(format!(
                    "enforcer reached an impossible transition: {state:?} on {event:?}"
                )));
            };
            if matches!(event, EnforcerEvent::ProviderFailed | EnforcerEvent::Invalid)
                && matches!(next, EnforcerState::Requested | EnforcerState::RepairRequested)
            {
                repairs_left -= 1;
            }
            tracing::debug!(from = ?state, to = ?next, ?event, repairs_left, "enforcer transition");
            state = next;
        }

        let Some((value, origin)) = accepted else {
            return Err(SynthError::schema("enforcer finished without content"));
        };
        Ok(SlotOutcome {
            value,
            origin,
            attempts,
            failures,
        })
    }

    fn system_prompt(&self, schema_text: &str) -> String {
        let mut s = self.ruleset.system_prompt.trim().to_owned();
        if !s.is_empty() {
            s.push_str("\n\n");
        }
        s.push_str("Respond only with a JSON object of the form {\"value\": ...} ");
        s.push_str("matching this JSON schema: ");
        s.push_str(schema_text);
        s
    }
}

fn user_prompt(req: &SlotRequest<'_>) -> String {
    let mut s = format!(
        "Document: {}. Write the content for block `{}` (slot `{}`).",
        req.document, req.block_id, req.slot
    );
    if let Some(p) = req.prompt {
        s.push(' ');
        s.push_str(p.trim());
    }
    s
}

#[cfg(test)]
#[path = "../../tests/unit/content/enforcer.rs"]
mod tests;
