use rulemancer::{
    fact_list_to_maps, Environment, FactFields, ResourceLimits, RulemancerError, RulemancerResult,
    Value,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Relation carrying a game's name and description
pub const GAME_CONFIG: &str = "game-config";

/// Id of the game built from the rule pool
pub const DEFAULT_GAME: &str = "default";

/// A rule file kept in memory so rooms can be built without touching disk
#[derive(Debug, Clone)]
pub struct RuleSource {
    pub source_id: String,
    pub text: String,
}

/// Request name → relations it carries
pub type Interface = BTreeMap<String, Vec<String>>;

/// A rule base rooms are built from.
///
/// Besides its rules a game declares what clients may do with a room.
/// `(assertable <name> <relation>...)` lists the relations a named
/// assertion carries, `(results <name> <relation>...)` the relations sent
/// back after it, and `(queryable <name> <relation>...)` the relations a
/// named query returns. Several facts with the same name add up.
#[derive(Debug, Serialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rules: String,
    pub assertable: Interface,
    pub responses: Interface,
    pub queryable: Interface,
    #[serde(skip)]
    sources: Vec<RuleSource>,
    #[serde(skip)]
    limits: ResourceLimits,
}

impl Game {
    /// Load a configured game. Its rules must hold exactly one
    /// `game-config` fact with `game-name` and `description` slots.
    pub fn load(
        rules: String,
        sources: Vec<RuleSource>,
        limits: ResourceLimits,
    ) -> RulemancerResult<Self> {
        let mut game = Self::unnamed(rules, sources, limits);
        let env = game.build_environment()?;
        let (name, description) = game_config(&env)?.ok_or_else(|| {
            RulemancerError::Engine(format!("No {} fact in {}", GAME_CONFIG, game.rules))
        })?;
        game.name = name;
        game.description = description;
        game.read_interface(&env)?;
        Ok(game)
    }

    /// The rule pool, served to rooms that name no game. A `game-config`
    /// fact is optional here.
    pub fn pool(
        rules: String,
        sources: Vec<RuleSource>,
        limits: ResourceLimits,
    ) -> RulemancerResult<Self> {
        let mut game = Self::unnamed(rules, sources, limits);
        let env = game.build_environment()?;
        let (name, description) =
            game_config(&env)?.unwrap_or_else(|| (DEFAULT_GAME.to_string(), String::new()));
        game.id = DEFAULT_GAME.to_string();
        game.name = name;
        game.description = description;
        game.read_interface(&env)?;
        Ok(game)
    }

    fn unnamed(rules: String, sources: Vec<RuleSource>, limits: ResourceLimits) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            rules,
            assertable: Interface::new(),
            responses: Interface::new(),
            queryable: Interface::new(),
            sources,
            limits,
        }
    }

    /// Load every rule source, reset and run to fixpoint.
    ///
    /// Output printed by the initial run is dropped, so the first request
    /// against a room only sees its own output.
    pub fn build_environment(&self) -> RulemancerResult<Environment> {
        let mut env = Environment::with_limits(self.limits.clone());
        for source in &self.sources {
            env.load_str(&source.text, &source.source_id)?;
        }
        env.reset()?;
        let fired = env.run(None)?;
        let output = env.take_output();
        debug!(rules = %self.rules, fired, output = %output, "built environment");
        Ok(env)
    }

    fn read_interface(&mut self, env: &Environment) -> RulemancerResult<()> {
        self.assertable = interface(env, "assertable")?;
        self.responses = interface(env, "results")?;
        self.queryable = interface(env, "queryable")?;
        Ok(())
    }
}

/// Name and description from the single `game-config` fact, if any
fn game_config(env: &Environment) -> RulemancerResult<Option<(String, String)>> {
    let dump = env
        .dump_facts_by_relation(GAME_CONFIG)
        .ok_or_else(|| RulemancerError::Engine("Cannot allocate fact dump".to_string()))?;
    let Some(items) = fact_list_to_maps(GAME_CONFIG, &dump)? else {
        return Ok(None);
    };
    let [item] = items.as_slice() else {
        return Err(RulemancerError::Engine(format!(
            "Found {} {} facts, expected one",
            items.len(),
            GAME_CONFIG
        )));
    };

    let slot = |name: &str| {
        item.get(name)
            .map(|value| value.trim_matches('"').to_string())
            .ok_or_else(|| {
                RulemancerError::Engine(format!("{} has no {} slot", GAME_CONFIG, name))
            })
    };
    Ok(Some((slot("game-name")?, slot("description")?)))
}

fn interface(env: &Environment, relation: &str) -> RulemancerResult<Interface> {
    let mut interface = Interface::new();
    for fact in env.facts().filter(|fact| fact.relation == relation) {
        let FactFields::Ordered(values) = &fact.fields else {
            return Err(RulemancerError::Engine(format!(
                "{} must be an ordered fact, found {}",
                relation, fact
            )));
        };
        let mut names = values.iter().map(field_name);
        let Some(name) = names.next() else {
            return Err(RulemancerError::Engine(format!("{} names no request", fact)));
        };
        interface.entry(name).or_default().extend(names);
    }
    Ok(interface)
}

fn field_name(value: &Value) -> String {
    match value {
        Value::Symbol(text) | Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
