use crate::evaluator::facts::{ordered_fields, spec_fields};
use crate::evaluator::{self, Activation, ActivationKey, RunState};
use crate::fact::{Fact, FactId, FactStore};
use crate::semantic::{Construct, Deffacts, Rule, Template};
use crate::serializers::text;
use crate::value::Value;
use crate::{parse_constructs, parse_fact, ResourceLimits, RulemancerError, RulemancerResult, Validator};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Templates, deffacts and rules of an environment, each in definition order.
#[derive(Debug, Default, Clone)]
pub struct ConstructBase {
    templates: Vec<Template>,
    deffacts: Vec<Deffacts>,
    rules: Vec<Rule>,
}

impl ConstructBase {
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn deffacts(&self) -> &[Deffacts] {
        &self.deffacts
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.deffacts.is_empty() && self.rules.is_empty()
    }

    /// Add a construct, replacing one of the same kind and name in place.
    fn define(&mut self, construct: Construct) {
        fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
            match items.iter_mut().find(|existing| same(existing)) {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
        }

        match construct {
            Construct::Template(t) => {
                let name = t.name.clone();
                upsert(&mut self.templates, t, |e| e.name == name)
            }
            Construct::Deffacts(d) => {
                let name = d.name.clone();
                upsert(&mut self.deffacts, d, |e| e.name == name)
            }
            Construct::Rule(r) => {
                let name = r.name.clone();
                upsert(&mut self.rules, r, |e| e.name == name)
            }
        }
    }
}

/// A rule-engine environment.
///
/// Owns working memory, the loaded constructs and the agenda bookkeeping.
/// Fact ids handed out stay meaningful until the next [`reset`](Self::reset)
/// or [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct Environment {
    constructs: ConstructBase,
    facts: FactStore,
    refracted: HashSet<ActivationKey>,
    output: String,
    limits: ResourceLimits,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    /// Create an environment with custom resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            constructs: ConstructBase::default(),
            facts: FactStore::new(),
            refracted: HashSet::new(),
            output: String::new(),
            limits,
        }
    }

    /// Get the current resource limits
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn constructs(&self) -> &ConstructBase {
        &self.constructs
    }

    /// Load a rule file. See [`load_str`](Self::load_str).
    pub fn load(&mut self, path: impl AsRef<Path>) -> RulemancerResult<usize> {
        let path = path.as_ref();
        let io_error = |e: std::io::Error| RulemancerError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let size = std::fs::metadata(path).map_err(io_error)?.len();
        if size > self.limits.max_file_size_bytes as u64 {
            return Err(RulemancerError::ResourceLimitExceeded {
                limit_name: "max_file_size_bytes".to_string(),
                limit_value: self.limits.max_file_size_bytes.to_string(),
                actual_value: size.to_string(),
                suggestion: format!("Split {} into smaller rule files", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(io_error)?;
        self.load_str(&content, &path.display().to_string())
    }

    /// Parse and add constructs, returning how many were defined.
    ///
    /// Nothing is committed unless every construct parses and validates.
    /// A construct with the name of an existing one of the same kind
    /// replaces it.
    pub fn load_str(&mut self, source: &str, source_id: &str) -> RulemancerResult<usize> {
        let constructs = parse_constructs(source, Some(source_id.to_string()), &self.limits)?;

        let validator = Validator::new(
            self.constructs.templates(),
            &constructs,
            source_id,
            Arc::from(source),
        );
        validator.validate_all(&constructs)?;
        validator.validate_existing(
            &constructs,
            self.constructs.rules(),
            self.constructs.deffacts(),
        )?;

        let count = constructs.len();
        for construct in constructs {
            trace!(name = construct.name(), "defining construct");
            self.constructs.define(construct);
        }
        info!(source = source_id, constructs = count, "loaded rules");
        Ok(count)
    }

    /// Empty working memory, forget the agenda history and assert every
    /// deffacts fact in definition order.
    ///
    /// On error working memory is left as it was.
    pub fn reset(&mut self) -> RulemancerResult<()> {
        let mut initial = Vec::new();
        for deffacts in &self.constructs.deffacts {
            for spec in &deffacts.facts {
                let fields = spec_fields(spec, self.constructs.template(&spec.relation))?;
                initial.push((spec.relation.clone(), fields));
            }
        }

        self.facts.clear();
        self.refracted.clear();
        self.output.clear();
        for (relation, fields) in initial {
            self.facts.insert(relation, fields);
        }
        debug!(facts = self.facts.len(), "reset");
        Ok(())
    }

    /// Remove every construct and fact.
    pub fn clear(&mut self) {
        self.constructs = ConstructBase::default();
        self.facts.clear();
        self.refracted.clear();
        self.output.clear();
        debug!("cleared environment");
    }

    /// Assert a fact written as text, e.g. `(move (player x) (x 1) (y 2))`.
    ///
    /// Asserting a fact identical to one already present returns the id of
    /// the existing fact.
    pub fn assert_string(&mut self, text: &str) -> RulemancerResult<FactId> {
        let spec = parse_fact(text.trim(), &self.limits)?;
        let fields = spec_fields(&spec, self.constructs.template(&spec.relation))?;
        let (id, added) = self.facts.insert(spec.relation, fields);
        if added {
            debug!(fact = %id, "asserted fact");
        } else {
            trace!(fact = %id, "fact already present");
        }
        Ok(id)
    }

    /// Assert an ordered fact from values.
    pub fn assert_ordered(
        &mut self,
        relation: impl Into<String>,
        values: Vec<Value>,
    ) -> RulemancerResult<FactId> {
        let relation = relation.into();
        if self.constructs.template(&relation).is_some() {
            return Err(RulemancerError::runtime(format!(
                "'{}' is a deftemplate; assert it with (slot value) groups",
                relation
            )));
        }
        let (id, _) = self.facts.insert(relation, ordered_fields(values));
        Ok(id)
    }

    pub fn retract(&mut self, id: FactId) -> RulemancerResult<Fact> {
        let fact = self.facts.remove(id).ok_or_else(|| {
            RulemancerError::runtime(format!("Cannot retract {}: fact does not exist", id))
        })?;
        debug!(fact = %id, relation = %fact.relation, "retracted fact");
        Ok(fact)
    }

    /// Run the inference cycle, firing at most `limit` rules (`None` runs to
    /// fixpoint). Returns the number of rules fired.
    pub fn run(&mut self, limit: Option<usize>) -> RulemancerResult<usize> {
        let fired = evaluator::run(
            RunState {
                constructs: &self.constructs,
                facts: &mut self.facts,
                refracted: &mut self.refracted,
                output: &mut self.output,
            },
            limit,
            &self.limits,
        )?;
        debug!(fired, facts = self.facts.len(), "run finished");
        Ok(fired)
    }

    /// Activations that would fire next, best first.
    pub fn agenda(&self) -> RulemancerResult<Vec<Activation>> {
        Ok(evaluator::build_agenda(&self.constructs, &self.facts)?
            .into_iter()
            .filter(|a| !self.refracted.contains(&a.key()))
            .collect())
    }

    /// All facts in insertion order.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }

    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id)
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Text written by `printout` since the last call.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Every fact's pretty form followed by a newline, in insertion order.
    /// `None` if the buffer cannot be allocated.
    pub fn dump_facts(&self) -> Option<String> {
        text::dump_all(&self.facts)
    }

    /// Pretty forms of the facts of one relation, concatenated without a
    /// separator. `None` if the buffer cannot be allocated.
    pub fn dump_facts_by_relation(&self, relation: &str) -> Option<String> {
        text::dump_relation(&self.facts, relation)
    }
}
