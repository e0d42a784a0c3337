//! Rendering working memory as text or JSON

pub mod json;
pub mod text;

pub use json::{fact_to_json, facts_to_json};
pub use text::{dump_all, dump_relation, render_facts};
