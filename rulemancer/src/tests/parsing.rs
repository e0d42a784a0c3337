use crate::parser::{parse_constructs, parse_fact};
use crate::semantic::*;
use crate::value::Value;
use crate::{ResourceLimits, RulemancerError};

fn parse(source: &str) -> Vec<Construct> {
    parse_constructs(source, Some("test.clp".to_string()), &ResourceLimits::default()).unwrap()
}

#[test]
fn parse_empty_input() {
    assert!(parse("").is_empty());
    assert!(parse("   ; only a comment\n").is_empty());
}

#[test]
fn parse_deftemplate_with_defaults() {
    let constructs = parse(
        r#"
        (deftemplate move "a move"
           (slot player (default ?NONE))
           (slot x (default 0))
           (multislot tags (default a b))
           (slot note))
    "#,
    );
    assert_eq!(constructs.len(), 1);
    let Construct::Template(template) = &constructs[0] else {
        panic!("expected template, got {:?}", constructs[0]);
    };
    assert_eq!(template.name, "move");
    assert_eq!(template.comment.as_deref(), Some("a move"));
    assert_eq!(template.slots.len(), 4);
    assert_eq!(template.slots[0].default, SlotDefault::Required);
    assert_eq!(
        template.slots[1].default,
        SlotDefault::Value(vec![Value::Integer(0)])
    );
    assert_eq!(template.slots[2].kind, SlotKind::Multi);
    assert_eq!(
        template.slots[2].default,
        SlotDefault::Value(vec![Value::symbol("a"), Value::symbol("b")])
    );
    assert_eq!(template.slots[3].default, SlotDefault::Derive);
}

#[test]
fn parse_deftemplate_rejects_duplicate_slot() {
    let result = parse_constructs(
        "(deftemplate p (slot a) (slot a))",
        None,
        &ResourceLimits::default(),
    );
    let err = result.unwrap_err();
    assert!(err.to_string().contains("defined more than once"), "{}", err);
}

#[test]
fn parse_single_slot_default_needs_one_value() {
    let result = parse_constructs(
        "(deftemplate p (slot a (default 1 2)))",
        None,
        &ResourceLimits::default(),
    );
    assert!(matches!(result, Err(RulemancerError::Parse(_))));
}

#[test]
fn parse_deffacts_with_mixed_facts() {
    let constructs = parse(r#"(deffacts start "boot" (turn x) (board (size 3)) (name "tic tac"))"#);
    let Construct::Deffacts(deffacts) = &constructs[0] else {
        panic!("expected deffacts");
    };
    assert_eq!(deffacts.name, "start");
    assert_eq!(deffacts.facts.len(), 3);
    assert_eq!(deffacts.facts[0].relation, "turn");
    assert_eq!(
        deffacts.facts[0].items,
        vec![FactItem::Field(Value::symbol("x"))]
    );
    assert_eq!(
        deffacts.facts[1].items,
        vec![FactItem::SlotGroup {
            name: "size".to_string(),
            values: vec![Value::Integer(3)],
        }]
    );
    assert_eq!(
        deffacts.facts[2].items,
        vec![FactItem::Field(Value::string("tic tac"))]
    );
}

#[test]
fn parse_defrule_structure() {
    let constructs = parse(
        r#"
        (defrule play "place a mark"
           (declare (salience -5))
           ?m <- (move (player ?p) (x ?x&:(>= ?x 0)))
           (turn ?p)
           (not (occupied ?x ?))
           (test (< ?x 3))
           =>
           (retract ?m)
           (printout t "played " ?p crlf))
    "#,
    );
    let Construct::Rule(rule) = &constructs[0] else {
        panic!("expected rule");
    };
    assert_eq!(rule.name, "play");
    assert_eq!(rule.comment.as_deref(), Some("place a mark"));
    assert_eq!(rule.salience, -5);
    assert_eq!(rule.conditions.len(), 4);
    assert_eq!(rule.actions.len(), 2);

    let ConditionalElement::Pattern(pattern) = &rule.conditions[0] else {
        panic!("expected pattern");
    };
    assert_eq!(pattern.binding.as_deref(), Some("m"));
    assert_eq!(pattern.relation, "move");
    let PatternBody::Slots(slots) = &pattern.body else {
        panic!("expected slot pattern");
    };
    assert_eq!(slots[0].slot, "player");
    assert_eq!(
        slots[0].fields,
        vec![FieldConstraint::Single(vec![Term::Variable("p".to_string())])]
    );
    let FieldConstraint::Single(terms) = &slots[1].fields[0] else {
        panic!("expected single field");
    };
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0], Term::Variable("x".to_string()));
    assert!(matches!(terms[1], Term::Predicate(_)));

    assert!(matches!(rule.conditions[1], ConditionalElement::Pattern(_)));
    let ConditionalElement::Not(negated) = &rule.conditions[2] else {
        panic!("expected not");
    };
    assert_eq!(negated.relation, "occupied");
    assert!(matches!(rule.conditions[3], ConditionalElement::Test(_)));
}

#[test]
fn parse_field_connectives() {
    let constructs = parse("(defrule r (color ~red&~blue) (size small|medium) (list $?items ?last) => )");
    let Construct::Rule(rule) = &constructs[0] else {
        panic!("expected rule");
    };
    let field = |i: usize| match &rule.conditions[i] {
        ConditionalElement::Pattern(Pattern {
            body: PatternBody::Ordered(fields),
            ..
        }) => fields.clone(),
        other => panic!("unexpected {:?}", other),
    };

    assert_eq!(
        field(0),
        vec![FieldConstraint::Single(vec![
            Term::Not(Box::new(Term::Literal(Value::symbol("red")))),
            Term::Not(Box::new(Term::Literal(Value::symbol("blue")))),
        ])]
    );
    assert_eq!(
        field(1),
        vec![FieldConstraint::Single(vec![Term::Or(vec![
            Term::Literal(Value::symbol("small")),
            Term::Literal(Value::symbol("medium")),
        ])])]
    );
    assert_eq!(
        field(2),
        vec![
            FieldConstraint::Multi(Some("items".to_string())),
            FieldConstraint::Single(vec![Term::Variable("last".to_string())]),
        ]
    );
    assert!(rule.actions.is_empty());
}

#[test]
fn parse_literals() {
    let spec = parse_fact(
        r#"(data 42 -7 1.5 2e3 "say \"hi\"" sym-bol)"#,
        &ResourceLimits::default(),
    )
    .unwrap();
    let values: Vec<Value> = spec
        .items
        .into_iter()
        .map(|item| match item {
            FactItem::Field(v) => v,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(
        values,
        vec![
            Value::Integer(42),
            Value::Integer(-7),
            Value::Float(1.5),
            Value::Float(2000.0),
            Value::string("say \"hi\""),
            Value::symbol("sym-bol"),
        ]
    );
}

#[test]
fn parse_fact_rejects_garbage() {
    let limits = ResourceLimits::default();
    assert!(parse_fact("turn x", &limits).is_err());
    assert!(parse_fact("(turn x", &limits).is_err());
    assert!(parse_fact("(a) (b)", &limits).is_err());
    assert!(parse_fact("", &limits).is_err());
}

#[test]
fn parse_rejects_nul_characters() {
    let limits = ResourceLimits::default();
    assert!(parse_fact("(name \"a\0b\")", &limits).is_err());
    assert!(parse_fact("(name \"a\\\0\")", &limits).is_err());
    assert!(parse_fact("(name a\0b)", &limits).is_err());
    assert!(parse_constructs("(deffacts d (name \"x\0\"))", None, &limits).is_err());
}

#[test]
fn parse_error_carries_location() {
    let err = parse_constructs(
        "(deftemplate ok (slot a))\n(defrule broken (a ?x)",
        Some("rules.clp".to_string()),
        &ResourceLimits::default(),
    )
    .unwrap_err();
    let RulemancerError::Parse(details) = err else {
        panic!("expected parse error");
    };
    assert_eq!(details.source_id, "rules.clp");
    assert_eq!(details.span.line, 2);
}

#[test]
fn parse_respects_file_size_limit() {
    let limits = ResourceLimits {
        max_file_size_bytes: 10,
        ..ResourceLimits::default()
    };
    let err = parse_constructs("(deffacts start (a) (b) (c))", None, &limits).unwrap_err();
    assert!(matches!(
        err,
        RulemancerError::ResourceLimitExceeded { ref limit_name, .. } if limit_name == "max_file_size_bytes"
    ));
}

#[test]
fn parse_fact_respects_text_limit() {
    let limits = ResourceLimits {
        max_fact_text_bytes: 8,
        ..ResourceLimits::default()
    };
    assert!(parse_fact("(a b)", &limits).is_ok());
    assert!(matches!(
        parse_fact("(a b c d e f)", &limits),
        Err(RulemancerError::ResourceLimitExceeded { .. })
    ));
}
