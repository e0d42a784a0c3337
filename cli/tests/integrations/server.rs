use assert_cmd::Command;

#[test]
fn test_serve_command_available() {
    let mut cmd = Command::cargo_bin("rulemancer").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("serve"));
}

#[test]
fn test_serve_requires_rule_pool() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("rulemancer").unwrap();
    cmd.current_dir(dir.path()).args(["serve", "--port", "0"]);

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Rule pool"));
}

#[test]
fn test_serve_needs_both_tls_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("rulemancer").unwrap();
    cmd.current_dir(dir.path())
        .args(["serve", "--port", "0", "--tls-cert", "server.crt"]);

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("both a TLS certificate and a TLS key"));
}
