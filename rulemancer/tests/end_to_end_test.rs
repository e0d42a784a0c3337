use rulemancer::{fact_list_to_maps, Environment};
use std::collections::BTreeMap;

const TIC_TAC_TOE: &str = r#"
; Tic-tac-toe: players assert (move (player p) (cell n)) facts.

(deftemplate move (slot player) (slot cell))
(deftemplate cell (slot pos) (slot mark (default empty)))

(deffacts board
   (turn x)
   (cell (pos 1)) (cell (pos 2)) (cell (pos 3))
   (cell (pos 4)) (cell (pos 5)) (cell (pos 6))
   (cell (pos 7)) (cell (pos 8)) (cell (pos 9))
   (line 1 2 3) (line 4 5 6) (line 7 8 9)
   (line 1 4 7) (line 2 5 8) (line 3 6 9)
   (line 1 5 9) (line 3 5 7))

(defrule reject-out-of-turn
   (declare (salience 10))
   ?m <- (move (player ?p))
   (turn ?q&~?p)
   =>
   (retract ?m)
   (printout t "not your turn " ?p crlf))

(defrule reject-taken
   (declare (salience 10))
   ?m <- (move (cell ?c))
   (cell (pos ?c) (mark ~empty))
   =>
   (retract ?m)
   (printout t "cell " ?c " is taken" crlf))

(defrule play "place the mark of the player on turn"
   ?m <- (move (player ?p) (cell ?c))
   ?t <- (turn ?p)
   ?cell <- (cell (pos ?c) (mark empty))
   (not (winner ?))
   =>
   (retract ?m ?t)
   (modify ?cell (mark ?p))
   (assert (turn (if (eq ?p x) then o else x))))

(defrule win
   (declare (salience 5))
   (line ?a ?b ?c)
   (cell (pos ?a) (mark ?p&~empty))
   (cell (pos ?b) (mark ?p))
   (cell (pos ?c) (mark ?p))
   (not (winner ?))
   =>
   (assert (winner ?p))
   (printout t ?p " wins" crlf))
"#;

fn new_game() -> Environment {
    let mut env = Environment::new();
    env.load_str(TIC_TAC_TOE, "tic-tac-toe.clp").unwrap();
    env.reset().unwrap();
    env.run(None).unwrap();
    env
}

fn play(env: &mut Environment, player: &str, cell: u8) -> String {
    env.assert_string(&format!("(move (player {}) (cell {}))", player, cell))
        .unwrap();
    env.run(None).unwrap();
    env.take_output()
}

fn board(env: &Environment) -> BTreeMap<String, String> {
    let dump = env.dump_facts_by_relation("cell").unwrap();
    fact_list_to_maps("cell", &dump)
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|cell| (cell["pos"].clone(), cell["mark"].clone()))
        .collect()
}

#[test]
fn test_new_game_board() {
    let env = new_game();
    let board = board(&env);
    assert_eq!(board.len(), 9);
    assert!(board.values().all(|mark| mark == "empty"));
    assert_eq!(env.dump_facts_by_relation("turn").unwrap(), "(turn x)");
    assert_eq!(env.dump_facts_by_relation("line").unwrap().matches("(line").count(), 8);
}

#[test]
fn test_moves_alternate_turns() {
    let mut env = new_game();
    assert_eq!(play(&mut env, "x", 5), "");
    assert_eq!(env.dump_facts_by_relation("turn").unwrap(), "(turn o)");
    assert_eq!(play(&mut env, "o", 1), "");
    assert_eq!(env.dump_facts_by_relation("turn").unwrap(), "(turn x)");

    let board = board(&env);
    assert_eq!(board["5"], "x");
    assert_eq!(board["1"], "o");
    assert_eq!(board["9"], "empty");
    assert_eq!(env.dump_facts_by_relation("move").unwrap(), "");
}

#[test]
fn test_out_of_turn_move_is_rejected() {
    let mut env = new_game();
    play(&mut env, "x", 5);
    assert_eq!(play(&mut env, "x", 6), "not your turn x\n");
    assert_eq!(board(&env)["6"], "empty");
    assert_eq!(env.dump_facts_by_relation("turn").unwrap(), "(turn o)");
}

#[test]
fn test_taken_cell_is_rejected() {
    let mut env = new_game();
    play(&mut env, "x", 5);
    assert_eq!(play(&mut env, "o", 5), "cell 5 is taken\n");
    assert_eq!(board(&env)["5"], "x");
    assert_eq!(env.dump_facts_by_relation("turn").unwrap(), "(turn o)");
}

#[test]
fn test_three_in_a_row_wins() {
    let mut env = new_game();
    play(&mut env, "x", 1);
    play(&mut env, "o", 4);
    play(&mut env, "x", 2);
    play(&mut env, "o", 5);
    assert_eq!(play(&mut env, "x", 3), "x wins\n");
    assert_eq!(env.dump_facts_by_relation("winner").unwrap(), "(winner x)");

    // no more moves after a win
    assert_eq!(play(&mut env, "o", 6), "");
    assert_eq!(board(&env)["6"], "empty");
}

#[test]
fn test_reset_starts_a_new_game() {
    let mut env = new_game();
    play(&mut env, "x", 1);
    env.reset().unwrap();
    assert!(board(&env).values().all(|mark| mark == "empty"));
    assert_eq!(env.dump_facts_by_relation("turn").unwrap(), "(turn x)");
}
