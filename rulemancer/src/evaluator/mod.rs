//! Inference driver
//!
//! Runs the match-resolve-act cycle:
//! 1. Match every rule against working memory to build the agenda
//! 2. Drop activations that already fired and are still live (refraction)
//! 3. Pick the best remaining activation (salience, then recency)
//! 4. Execute its actions, then start over
//!
//! The cycle ends when the agenda is empty, `(halt)` runs, the firing limit
//! is reached or the run-time limit trips.

pub mod actions;
pub mod expression;
pub mod facts;
pub mod functions;
pub mod matcher;
pub mod timeout;

use crate::environment::ConstructBase;
use crate::fact::{FactId, FactStore};
use crate::value::Value;
use crate::{ResourceLimits, RulemancerResult};
use actions::ExecutionContext;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use timeout::TimeoutTracker;
use tracing::{debug, trace};

/// Variable bindings of a (partial) match. Ordered so that activations
/// render deterministically.
pub type Bindings = BTreeMap<String, Value>;

/// A rule whose conditions are satisfied by specific facts
#[derive(Debug, Clone)]
pub struct Activation {
    pub rule: String,
    pub salience: i64,
    pub facts: Vec<FactId>,
    pub bindings: Bindings,
    /// Position of the rule in definition order, used as the last tie-breaker
    pub(crate) rule_order: usize,
}

/// Identity of an activation for refraction purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ActivationKey {
    rule: String,
    facts: Vec<FactId>,
    bindings: String,
}

impl Activation {
    pub(crate) fn key(&self) -> ActivationKey {
        let bindings = self
            .bindings
            .iter()
            .map(|(name, value)| format!("?{}={}", name, value))
            .collect::<Vec<_>>()
            .join(" ");
        ActivationKey {
            rule: self.rule.clone(),
            facts: self.facts.clone(),
            bindings,
        }
    }

    /// Fact ids from newest to oldest, used for the depth strategy.
    fn recency(&self) -> Vec<FactId> {
        let mut ids = self.facts.clone();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids
    }

    /// Conflict resolution order: `Less` means `self` fires first.
    fn priority_cmp(&self, other: &Activation) -> Ordering {
        other
            .salience
            .cmp(&self.salience)
            .then_with(|| other.recency().cmp(&self.recency()))
            .then_with(|| self.rule_order.cmp(&other.rule_order))
    }
}

/// Build the full agenda, best activation first.
pub(crate) fn build_agenda(
    constructs: &ConstructBase,
    facts: &FactStore,
) -> RulemancerResult<Vec<Activation>> {
    let mut agenda = Vec::new();
    for (rule_order, rule) in constructs.rules().iter().enumerate() {
        for m in matcher::match_conditions(&rule.conditions, facts)? {
            agenda.push(Activation {
                rule: rule.name.clone(),
                salience: rule.salience,
                facts: m.facts,
                bindings: m.bindings,
                rule_order,
            });
        }
    }
    agenda.sort_by(|a, b| a.priority_cmp(b));
    Ok(agenda)
}

/// Mutable engine state borrowed for the duration of a run.
pub(crate) struct RunState<'a> {
    pub constructs: &'a ConstructBase,
    pub facts: &'a mut FactStore,
    pub refracted: &'a mut HashSet<ActivationKey>,
    pub output: &'a mut String,
}

/// Fire rules until fixpoint, halt or `limit` firings. Returns the number of
/// rules fired.
pub(crate) fn run(
    state: RunState<'_>,
    limit: Option<usize>,
    limits: &ResourceLimits,
) -> RulemancerResult<usize> {
    let timeout_tracker = TimeoutTracker::new();
    let mut fired = 0;

    loop {
        if limit.is_some_and(|max| fired >= max) {
            break;
        }
        timeout_tracker.check_timeout(limits)?;

        let agenda = build_agenda(state.constructs, state.facts)?;
        let live: HashSet<ActivationKey> = agenda.iter().map(Activation::key).collect();
        state.refracted.retain(|key| live.contains(key));

        let Some(activation) = agenda
            .into_iter()
            .find(|a| !state.refracted.contains(&a.key()))
        else {
            trace!("agenda empty");
            break;
        };
        state.refracted.insert(activation.key());

        let Some(rule) = state.constructs.rule(&activation.rule) else {
            break;
        };
        debug!(rule = %rule.name, facts = ?activation.facts, "firing rule");

        let mut context = ExecutionContext {
            constructs: state.constructs,
            facts: &mut *state.facts,
            output: &mut *state.output,
            bindings: activation.bindings,
            halted: false,
        };
        for action in &rule.actions {
            context.execute(action)?;
        }
        fired += 1;

        if context.halted {
            debug!(rule = %rule.name, "halted");
            break;
        }
    }

    Ok(fired)
}
