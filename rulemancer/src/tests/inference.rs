use crate::environment::Environment;
use crate::{ResourceLimits, RulemancerError};

fn env_with(source: &str) -> Environment {
    let mut env = Environment::new();
    env.load_str(source, "test.clp").unwrap();
    env.reset().unwrap();
    env
}

fn dump(env: &Environment) -> String {
    env.dump_facts().unwrap()
}

#[test]
fn run_without_rules_fires_nothing() {
    let mut env = env_with("(deffacts start (a))");
    assert_eq!(env.run(None).unwrap(), 0);
    assert_eq!(dump(&env), "(a)\n");
}

#[test]
fn chained_rules_reach_fixpoint() {
    let mut env = env_with(
        r#"
        (deffacts start (count 0))
        (defrule step
           ?c <- (count ?n&:(< ?n 3))
           =>
           (retract ?c)
           (assert (count (+ ?n 1))))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 3);
    assert_eq!(dump(&env), "(count 3)\n");
}

#[test]
fn variables_join_across_patterns() {
    let mut env = env_with(
        r#"
        (deffacts start
           (parent tom bob) (parent bob ann) (parent bob joe) (parent sue kim))
        (defrule grandparent
           (parent ?g ?p)
           (parent ?p ?c)
           =>
           (assert (grandparent ?g ?c)))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 2);
    assert_eq!(
        env.dump_facts_by_relation("grandparent").unwrap(),
        "(grandparent tom joe)(grandparent tom ann)"
    );
}

#[test]
fn template_patterns_bind_slots() {
    let mut env = env_with(
        r#"
        (deftemplate move (slot player) (slot x) (slot y))
        (deffacts start (turn x))
        (defrule play
           ?m <- (move (player ?p) (x ?x) (y ?y))
           ?t <- (turn ?p)
           (not (occupied ?x ?y ?))
           =>
           (retract ?m ?t)
           (assert (occupied ?x ?y ?p))
           (assert (turn (if (eq ?p x) then o else x))))
    "#,
    );
    env.assert_string("(move (player o) (x 1) (y 1))").unwrap();
    assert_eq!(env.run(None).unwrap(), 0);

    env.assert_string("(move (player x) (x 1) (y 1))").unwrap();
    assert_eq!(env.run(None).unwrap(), 1);
    assert_eq!(
        dump(&env),
        "(move (player o) (x 1) (y 1))\n(occupied 1 1 x)\n(turn o)\n"
    );

    // the cell is taken now
    assert_eq!(env.run(None).unwrap(), 0);
}

#[test]
fn negation_blocks_until_fact_removed() {
    let mut env = env_with(
        r#"
        (deffacts start (door closed) (guard present))
        (defrule enter
           (door closed)
           (not (guard present))
           =>
           (assert (inside)))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 0);
    let guard = env
        .facts()
        .find(|f| f.relation == "guard")
        .map(|f| f.id)
        .unwrap();
    env.retract(guard).unwrap();
    assert_eq!(env.run(None).unwrap(), 1);
    assert!(dump(&env).contains("(inside)"));
}

#[test]
fn field_constraints() {
    let mut env = env_with(
        r#"
        (deffacts start
           (color red) (color green) (color blue)
           (size small) (size large))
        (defrule not-red (color ?c&~red&~blue) => (assert (picked ?c)))
        (defrule small-or-medium (size ?s&small|medium) => (assert (fits ?s)))
    "#,
    );
    env.run(None).unwrap();
    assert_eq!(env.dump_facts_by_relation("picked").unwrap(), "(picked green)");
    assert_eq!(env.dump_facts_by_relation("fits").unwrap(), "(fits small)");
}

#[test]
fn multifield_matching_backtracks() {
    let mut env = env_with(
        r#"
        (deffacts start (list a b c) (list))
        (defrule split
           (list $?front ?last)
           =>
           (assert (last ?last (length$ $?front))))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 1);
    assert_eq!(env.dump_facts_by_relation("last").unwrap(), "(last c 2)");
}

#[test]
fn multislot_patterns() {
    let mut env = env_with(
        r#"
        (deftemplate hand (multislot cards))
        (deffacts start (hand (cards 2 7 9)))
        (defrule has-seven
           (hand (cards $? 7 $?rest))
           =>
           (assert (after-seven $?rest)))
    "#,
    );
    env.run(None).unwrap();
    assert_eq!(
        env.dump_facts_by_relation("after-seven").unwrap(),
        "(after-seven 9)"
    );
}

#[test]
fn test_conditional_element() {
    let mut env = env_with(
        r#"
        (deffacts start (n 1) (n 5) (n 10))
        (defrule big (n ?x) (test (> ?x 4)) => (assert (big ?x)))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 2);
    assert_eq!(env.dump_facts_by_relation("big").unwrap(), "(big 10)(big 5)");
}

#[test]
fn salience_orders_firing() {
    let mut env = env_with(
        r#"
        (deffacts start (go))
        (defrule low (go) => (printout t "low" crlf))
        (defrule high (declare (salience 10)) (go) => (printout t "high" crlf))
        (defrule negative (declare (salience -1)) (go) => (printout t "negative" crlf))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 3);
    assert_eq!(env.take_output(), "high\nlow\nnegative\n");
    assert_eq!(env.take_output(), "");
}

#[test]
fn newer_facts_fire_first() {
    let mut env = env_with(
        r#"
        (defrule echo (item ?x) => (printout t ?x " "))
    "#,
    );
    env.assert_string("(item first)").unwrap();
    env.assert_string("(item second)").unwrap();
    env.assert_string("(item third)").unwrap();
    env.run(None).unwrap();
    assert_eq!(env.take_output(), "third second first ");
}

#[test]
fn definition_order_breaks_ties() {
    let mut env = env_with(
        r#"
        (deffacts start (go))
        (defrule first (go) => (printout t "1"))
        (defrule second (go) => (printout t "2"))
    "#,
    );
    env.run(None).unwrap();
    assert_eq!(env.take_output(), "12");
}

#[test]
fn agenda_lists_pending_activations() {
    let mut env = env_with(
        r#"
        (deffacts start (a 1) (a 2))
        (defrule r (declare (salience 5)) (a ?x) => )
        (defrule s (a ?x) => )
    "#,
    );
    let agenda = env.agenda().unwrap();
    let order: Vec<(String, u64)> = agenda
        .iter()
        .map(|a| (a.rule.clone(), a.facts[0].index()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("r".to_string(), 2),
            ("r".to_string(), 1),
            ("s".to_string(), 2),
            ("s".to_string(), 1),
        ]
    );
    env.run(Some(1)).unwrap();
    assert_eq!(env.agenda().unwrap().len(), 3);
}

#[test]
fn refraction_fires_each_activation_once() {
    let mut env = env_with(
        r#"
        (deffacts start (ping))
        (defrule echo (ping) => (printout t "pong"))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 1);
    assert_eq!(env.run(None).unwrap(), 0);
    assert_eq!(env.take_output(), "pong");
}

#[test]
fn retracted_and_reasserted_fact_fires_again() {
    let mut env = env_with(
        r#"
        (defrule echo (ping) => (printout t "pong"))
    "#,
    );
    let id = env.assert_string("(ping)").unwrap();
    env.run(None).unwrap();
    env.retract(id).unwrap();
    env.run(None).unwrap();
    env.assert_string("(ping)").unwrap();
    env.run(None).unwrap();
    assert_eq!(env.take_output(), "pongpong");
}

#[test]
fn run_limit_bounds_firings() {
    let mut env = env_with(
        r#"
        (deffacts start (count 0))
        (defrule step ?c <- (count ?n) => (retract ?c) (assert (count (+ ?n 1))))
    "#,
    );
    assert_eq!(env.run(Some(5)).unwrap(), 5);
    assert_eq!(dump(&env), "(count 5)\n");
    assert_eq!(env.run(Some(0)).unwrap(), 0);
}

#[test]
fn runaway_rules_hit_time_limit() {
    let mut env = Environment::with_limits(ResourceLimits {
        max_run_time_ms: 50,
        ..ResourceLimits::default()
    });
    env.load_str(
        r#"
        (deffacts start (count 0))
        (defrule step ?c <- (count ?n) => (retract ?c) (assert (count (+ ?n 1))))
    "#,
        "loop.clp",
    )
    .unwrap();
    env.reset().unwrap();
    let err = env.run(None).unwrap_err();
    assert!(matches!(
        err,
        RulemancerError::ResourceLimitExceeded { ref limit_name, .. } if limit_name == "max_run_time_ms"
    ));
}

#[test]
fn halt_stops_after_current_rule() {
    let mut env = env_with(
        r#"
        (deffacts start (go))
        (defrule stop (declare (salience 10)) (go) => (printout t "a") (halt) (printout t "b"))
        (defrule later (go) => (printout t "c"))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 1);
    assert_eq!(env.take_output(), "ab");
    assert_eq!(env.run(None).unwrap(), 1);
    assert_eq!(env.take_output(), "c");
}

#[test]
fn modify_replaces_fact() {
    let mut env = env_with(
        r#"
        (deftemplate counter (slot name) (slot value (default 0)))
        (deffacts start (counter (name clicks)) (tick) )
        (defrule bump
           ?t <- (tick)
           ?c <- (counter (value ?v))
           =>
           (retract ?t)
           (modify ?c (value (+ ?v 1))))
    "#,
    );
    assert_eq!(env.run(None).unwrap(), 1);
    assert_eq!(dump(&env), "(counter (name clicks) (value 1))\n");
    let counter = env.facts().next().unwrap();
    assert_eq!(counter.id.index(), 3);
}

#[test]
fn bind_and_arithmetic_on_rhs() {
    let mut env = env_with(
        r#"
        (deffacts start (price 10) (qty 3))
        (defrule total
           (price ?p) (qty ?q)
           =>
           (bind ?t (* ?p ?q))
           (assert (total ?t (/ ?t 4)))
           (printout t "total=" ?t tab "avg=" (/ ?t 4) crlf))
    "#,
    );
    env.run(None).unwrap();
    assert_eq!(env.dump_facts_by_relation("total").unwrap(), "(total 30 7.5)");
    assert_eq!(env.take_output(), "total=30\tavg=7.5\n");
}

#[test]
fn rhs_errors_abort_the_run() {
    let mut env = env_with(
        r#"
        (deffacts start (go))
        (defrule bad (go) => (assert (result (+ nothing 1))))
    "#,
    );
    let err = env.run(None).unwrap_err();
    assert!(err.to_string().contains("Function '+'"), "{}", err);
}

#[test]
fn fact_addresses_render_in_facts() {
    let mut env = env_with(
        r#"
        (deffacts start (a))
        (defrule link ?f <- (a) => (assert (points-to ?f)))
    "#,
    );
    env.run(None).unwrap();
    assert_eq!(
        env.dump_facts_by_relation("points-to").unwrap(),
        "(points-to <Fact-1>)"
    );
}
