use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const GAME: &str = r#"
(deftemplate move (slot player) (slot cell))
(deftemplate mark (slot cell) (slot player))

(deffacts start
   (turn x)
   (other x o)
   (other o x))

(defrule play "Place the mark of the player whose turn it is"
   ?m <- (move (player ?p) (cell ?c))
   ?t <- (turn ?p)
   (other ?p ?q)
   (not (mark (cell ?c)))
   =>
   (retract ?m ?t)
   (assert (mark (cell ?c) (player ?p)))
   (assert (turn ?q))
   (printout t ?p " takes " ?c crlf))
"#;

/// A workspace with a rule pool holding the game and an empty test pool
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("rulepool")).unwrap();
    fs::create_dir(dir.path().join("testpool")).unwrap();
    fs::write(dir.path().join("rulepool/game.clp"), GAME).unwrap();
    dir
}

fn rulemancer(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rulemancer").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_cli_test_replays_moves_in_name_order() {
    let dir = workspace();
    fs::write(
        dir.path().join("testpool/01-x"),
        "(move (player x) (cell 4))\n",
    )
    .unwrap();
    fs::write(dir.path().join("testpool/02-o"), "(move (player o) (cell 0))").unwrap();

    rulemancer(dir.path())
        .arg("test")
        .assert()
        .success()
        .stdout(predicate::str::contains("x takes 4\no takes 0\n"))
        .stdout(predicate::str::contains("2 passed, 0 failed"))
        .stdout(predicate::str::contains("(mark (cell 4) (player x))\n"))
        .stdout(predicate::str::contains("(mark (cell 0) (player o))\n"))
        .stdout(predicate::str::contains("(turn x)\n"));
}

#[test]
fn test_cli_test_reports_and_skips_bad_test_file() {
    let dir = workspace();
    fs::write(dir.path().join("testpool/01-broken"), "(move (player x").unwrap();
    fs::write(dir.path().join("testpool/02-x"), "(move (player x) (cell 8))").unwrap();

    rulemancer(dir.path())
        .arg("test")
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("1 passed, 1 failed"))
        .stdout(predicate::str::contains("(mark (cell 8) (player x))"));
}

#[test]
fn test_cli_test_with_explicit_pools() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("rules")).unwrap();
    fs::create_dir(dir.path().join("moves")).unwrap();
    fs::write(dir.path().join("rules/game.clp"), GAME).unwrap();
    fs::write(dir.path().join("moves/first"), "(move (player x) (cell 2))").unwrap();

    rulemancer(dir.path())
        .args(["test", "--rulepool", "rules", "--testpool", "moves"])
        .assert()
        .success()
        .stdout(predicate::str::contains("x takes 2"));
}

#[test]
fn test_cli_missing_rule_pool() {
    let dir = TempDir::new().unwrap();

    rulemancer(dir.path())
        .arg("facts")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_cli_facts_dump() {
    let dir = workspace();

    rulemancer(dir.path())
        .arg("facts")
        .assert()
        .success()
        .stdout(predicate::str::diff("(turn x)\n(other x o)\n(other o x)\n"));
}

#[test]
fn test_cli_facts_by_relation() {
    let dir = workspace();

    rulemancer(dir.path())
        .args(["facts", "--relation", "other"])
        .assert()
        .success()
        .stdout(predicate::str::diff("(other x o)(other o x)\n"));
}

#[test]
fn test_cli_facts_table() {
    let dir = workspace();

    rulemancer(dir.path())
        .args(["facts", "--table", "--relation", "other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fact"))
        .stdout(predicate::str::contains("f-2"))
        .stdout(predicate::str::contains("(other x o)"))
        .stdout(predicate::str::contains("(other o x)"))
        .stdout(predicate::str::contains("(turn x)").not());

    rulemancer(dir.path())
        .args(["facts", "--table", "--relation", "mark"])
        .assert()
        .success()
        .stdout(predicate::str::diff("No facts\n"));

    rulemancer(dir.path())
        .args(["facts", "--table", "--json"])
        .assert()
        .failure();
}

#[test]
fn test_cli_facts_json() {
    let dir = workspace();

    let output = rulemancer(dir.path())
        .args(["facts", "--json", "--relation", "turn"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["relation"], "turn");
    assert_eq!(json[0]["fields"][0], "x");
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[test]
fn test_cli_show_inventory() {
    let dir = workspace();

    rulemancer(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("templates (2):"))
        .stdout(predicate::str::contains("deffacts (1):"))
        .stdout(predicate::str::contains("rules (1):"))
        .stdout(predicate::str::contains("Place the mark"));
}

#[test]
fn test_cli_parse_error_handling() {
    let dir = workspace();
    fs::write(
        dir.path().join("rulepool/zz-broken.clp"),
        "(defrule broken\n  (turn ?p)\n  =>\n  (assert (winner ?p))",
    )
    .unwrap();

    rulemancer(dir.path())
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"))
        .stderr(predicate::str::contains("zz-broken.clp"));
}

#[test]
fn test_cli_semantic_error_shows_help() {
    let dir = workspace();
    fs::write(
        dir.path().join("rulepool/zz-typo.clp"),
        "(defrule typo (move (colour red)) => (halt))",
    )
    .unwrap();

    rulemancer(dir.path())
        .arg("facts")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Semantic error"))
        .stderr(predicate::str::contains("Known slots"));
}

#[test]
fn test_cli_config_file_sets_pools() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("games")).unwrap();
    fs::write(dir.path().join("games/game.clp"), GAME).unwrap();
    fs::write(
        dir.path().join("rulemancer.json"),
        r#"{"rule_pool": "games"}"#,
    )
    .unwrap();

    rulemancer(dir.path())
        .args(["facts", "--relation", "turn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(turn x)"));
}

#[test]
fn test_cli_missing_explicit_config() {
    let dir = workspace();

    rulemancer(dir.path())
        .args(["--config", "nope.json", "facts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read config file"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("rulemancer")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
