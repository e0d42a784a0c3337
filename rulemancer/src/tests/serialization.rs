use crate::environment::Environment;
use crate::fact::{FactFields, FactStore};
use crate::serializers::{facts_to_json, render_facts};
use crate::value::Value;

fn env_with_facts(facts: &[&str]) -> Environment {
    let mut env = Environment::new();
    for fact in facts {
        env.assert_string(fact).unwrap();
    }
    env
}

#[test]
fn empty_environment_dumps_empty_string() {
    let env = Environment::new();
    assert_eq!(env.dump_facts().unwrap(), "");
    assert_eq!(env.dump_facts_by_relation("a").unwrap(), "");
}

#[test]
fn relation_dump_has_no_separator() {
    let env = env_with_facts(&["(A 1)", "(A 2)", "(B 3)"]);
    assert_eq!(env.dump_facts_by_relation("A").unwrap(), "(A 1)(A 2)");
    assert_eq!(env.dump_facts_by_relation("B").unwrap(), "(B 3)");
    assert_eq!(env.dump_facts_by_relation("C").unwrap(), "");
}

#[test]
fn full_dump_ends_each_fact_with_newline() {
    let env = env_with_facts(&["(A 1)", "(B 3)", "(A 2)"]);
    assert_eq!(env.dump_facts().unwrap(), "(A 1)\n(B 3)\n(A 2)\n");
}

#[test]
fn dump_follows_insertion_order_after_retract() {
    let mut env = env_with_facts(&["(a 1)", "(a 2)", "(a 3)"]);
    let second = env.facts().nth(1).map(|f| f.id).unwrap();
    env.retract(second).unwrap();
    env.assert_string("(a 2)").unwrap();
    assert_eq!(env.dump_facts().unwrap(), "(a 1)\n(a 3)\n(a 2)\n");
}

#[test]
fn reset_then_dump_is_empty() {
    let mut env = env_with_facts(&["(A 1)", "(B 2)"]);
    env.load_str("(defrule r (A ?x) => (assert (C ?x)))", "r.clp")
        .unwrap();
    env.run(None).unwrap();
    env.reset().unwrap();
    assert_eq!(env.dump_facts().unwrap(), "");
}

#[test]
fn dump_does_not_mutate_store() {
    let env = env_with_facts(&["(A 1)", "(B 2)"]);
    let before = env.fact_count();
    let _ = env.dump_facts();
    let _ = env.dump_facts_by_relation("A");
    assert_eq!(env.fact_count(), before);
}

#[test]
fn pretty_forms_of_values() {
    let env = env_with_facts(&[
        r#"(values sym "a \"quoted\" \\ string" -3 2.0 1.25)"#,
        "(empty)",
    ]);
    assert_eq!(
        env.dump_facts().unwrap(),
        "(values sym \"a \\\"quoted\\\" \\\\ string\" -3 2.0 1.25)\n(empty)\n"
    );
}

#[test]
fn render_with_custom_separator() {
    let mut store = FactStore::new();
    store.insert("x".to_string(), FactFields::Ordered(vec![Value::Integer(1)]));
    store.insert("y".to_string(), FactFields::Ordered(vec![]));
    assert_eq!(
        render_facts(store.iter(), None, ", ").unwrap(),
        "(x 1), (y), "
    );
    assert_eq!(render_facts(store.iter(), Some("y"), "|").unwrap(), "(y)|");
}

#[test]
fn json_rendering() {
    let mut env = Environment::new();
    env.load_str("(deftemplate cell (slot pos) (multislot marks))", "t.clp")
        .unwrap();
    env.assert_string("(cell (pos 4) (marks x o))").unwrap();
    env.assert_string(r#"(note "hi" 1.5)"#).unwrap();

    let json = facts_to_json(env.facts());
    assert_eq!(
        json,
        serde_json::json!([
            {"id": 1, "relation": "cell", "slots": {"pos": 4, "marks": ["x", "o"]}},
            {"id": 2, "relation": "note", "fields": ["hi", 1.5]},
        ])
    );
}
