//! Message routing orchestration
//!
//! One [`Router`] per process, constructed at startup and shared with the
//! transport and the management API. Message handling is a single logical
//! stream: each inbound message runs match → dedup → interpret → validate →
//! deliver to completion before the next is considered. Rule replacement is
//! the only other writer and swaps a fresh `Arc<RuleSet>` under a write
//! lock, so an in-flight match always observes a fully old or fully new
//! list.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use signalk::identity::SelfIdentity;
use tracing::{debug, trace, warn};

use crate::dedup::DedupCache;
use crate::payload;
use crate::rule::ImportRule;
use crate::rules::RuleSet;
use crate::sink::DeltaSink;

/// Terminal state of one inbound message. No variant is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Delivered to the sink.
    Delivered,
    /// No enabled rule matched; dropped silently.
    NoMatch,
    /// Suppressed by the dedup cache.
    Duplicate,
    /// Full-format payload was not valid JSON; dropped with a diagnostic.
    Malformed,
    /// Interpreted delta failed validation; dropped before delivery.
    Invalid,
    /// Sink rejected the delta; engine state is unaffected.
    SinkFailed,
}

/// Counters for the management API's statistics endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub dedup_entries: usize,
}

/// Wires the rule set, self identity, dedup cache and sink together.
pub struct Router {
    identity: SelfIdentity,
    rules: RwLock<Arc<RuleSet>>,
    dedup: Mutex<DedupCache>,
    sink: Arc<dyn DeltaSink>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("identity", &self.identity)
            .field("rules", &self.rules.read().len())
            .field("dedup_entries", &self.dedup.lock().len())
            .finish()
    }
}

impl Router {
    pub fn new(rule_set: RuleSet, identity: SelfIdentity, sink: Arc<dyn DeltaSink>) -> Self {
        Self {
            identity,
            rules: RwLock::new(Arc::new(rule_set)),
            dedup: Mutex::new(DedupCache::new()),
            sink,
        }
    }

    pub fn identity(&self) -> &SelfIdentity {
        &self.identity
    }

    /// Snapshot of the current rule set.
    pub fn rule_set(&self) -> Arc<RuleSet> {
        self.rules.read().clone()
    }

    /// Atomically replace the rule list, keeping the configured prefix.
    ///
    /// Callers must re-apply [`Router::subscription_topics`] to the
    /// transport afterwards.
    pub fn replace_rules(&self, rules: Vec<ImportRule>) {
        let prefix = self.rule_set().topic_prefix().to_string();
        *self.rules.write() = Arc::new(RuleSet::new(rules, prefix));
    }

    /// Subscription set for the current rules and identity.
    pub fn subscription_topics(&self) -> BTreeSet<String> {
        self.rule_set().subscription_topics(&self.identity)
    }

    pub fn stats(&self) -> RouterStats {
        let rules = self.rule_set();
        RouterStats {
            total_rules: rules.len(),
            enabled_rules: rules.enabled_count(),
            dedup_entries: self.dedup.lock().len(),
        }
    }

    /// Process one inbound message to completion.
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> Outcome {
        let rule_set = self.rule_set();

        let Some(rule) = rule_set.find_match(topic, &self.identity) else {
            trace!(topic, "no rule matched, dropping message");
            return Outcome::NoMatch;
        };

        let payload_text = String::from_utf8_lossy(payload);
        if self
            .dedup
            .lock()
            .should_suppress(topic, &payload_text, rule.ignore_duplicates)
        {
            trace!(topic, rule = %rule.id, "suppressing duplicate message");
            return Outcome::Duplicate;
        }

        let cleaned_topic = rule_set.strip_prefix(topic);
        let timestamp = payload::now_timestamp();
        let delta = match payload::interpret(rule, cleaned_topic, &payload_text, &self.identity, &timestamp)
        {
            Ok(delta) => delta,
            Err(e) => {
                debug!(topic, rule = %rule.id, error = %e, "dropping unparseable payload");
                return Outcome::Malformed;
            }
        };

        if !delta.is_deliverable() {
            debug!(topic, rule = %rule.id, "dropping delta without context or values");
            return Outcome::Invalid;
        }

        match self.sink.deliver(delta).await {
            Ok(()) => {
                trace!(topic, rule = %rule.id, "delta delivered");
                Outcome::Delivered
            }
            Err(e) => {
                warn!(topic, error = %e, "sink rejected delta");
                Outcome::SinkFailed
            }
        }
    }
}
