//! # Rulemancer Engine
//!
//! **Rules for rule-based games**
//!
//! A small forward-chaining production-rule engine in the CLIPS family, with
//! a flat C interface for embedding.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rulemancer::{Environment, RulemancerResult};
//!
//! fn main() -> RulemancerResult<()> {
//!     let mut env = Environment::new();
//!
//!     env.load_str(r#"
//!         (deftemplate move (slot player) (slot cell))
//!         (deffacts start (turn x))
//!         (defrule play
//!            ?m <- (move (player ?p) (cell ?c))
//!            ?t <- (turn ?p)
//!            =>
//!            (retract ?m ?t)
//!            (assert (taken ?c ?p)))
//!     "#, "game.clp")?;
//!
//!     env.reset()?;
//!     env.assert_string("(move (player x) (cell 4))")?;
//!     env.run(None)?;
//!
//!     print!("{}", env.dump_facts().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Facts
//! A fact is a relation name followed by fields, either ordered
//! (`(turn x)`) or named by a template (`(move (player x) (cell 4))`).
//! Facts live in the working memory of an [`Environment`].
//!
//! ### Rules
//! A rule fires when its patterns match facts. Its actions assert, retract
//! and modify facts, which may activate further rules. [`Environment::run`]
//! keeps firing until nothing is left on the agenda.
//!
//! ### Dumps
//! The text dumps hand working memory back as the pretty-printed forms of
//! the facts; [`query`] turns them into maps.

pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod fact;
pub mod ffi;
pub mod parser;
pub mod query;
pub mod resource_limits;
pub mod semantic;
pub mod serializers;
pub mod validator;
pub mod value;

pub use ast::Span;
pub use environment::{ConstructBase, Environment};
pub use error::{ErrorDetails, RulemancerError};
pub use evaluator::Activation;
pub use fact::{Fact, FactFields, FactId, Slot};
pub use parser::{parse_constructs, parse_fact};
pub use query::{fact_list_to_maps, split_fields};
pub use resource_limits::ResourceLimits;
pub use semantic::*;
pub use validator::Validator;
pub use value::Value;

/// Result type for rulemancer operations
pub type RulemancerResult<T> = Result<T, RulemancerError>;

#[cfg(test)]
mod tests;
