//! End-to-end tests against the argon binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn argon() -> Command {
    Command::cargo_bin("argon").unwrap()
}

#[test]
fn shows_help() {
    argon()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("echo"))
        .stdout(predicate::str::contains("calc sum"));
}

#[test]
fn shows_version() {
    argon()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn echo_binds_positionally() {
    argon()
        .args(["echo", "hello"])
        .assert()
        .success()
        .stdout("hello\n");
}

#[test]
fn echo_named_after_positional() {
    argon()
        .args(["echo", "hi", "-r", "2", "--loud"])
        .assert()
        .success()
        .stdout("HI\nHI\n");
}

#[test]
fn echo_with_no_args_prints_usage() {
    // A required parameter and an empty argument vector short-circuit to help
    argon()
        .arg("echo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: argon echo"))
        .stdout(predicate::str::contains("[required]"));
}

#[test]
fn nested_command_with_rest_collector() {
    argon()
        .args(["calc", "sum", "1", "2", "3"])
        .assert()
        .success()
        .stdout("6\n");
}

#[test]
fn sum_json_output() {
    argon()
        .args(["calc", "sum", "--json", "--values", "1,2,3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sum\":6"));
}

#[test]
fn avg_accepts_both_list_grammars() {
    argon()
        .args(["calc", "avg", "--values", "1,2,3"])
        .assert()
        .success()
        .stdout("2\n");

    argon()
        .args(["calc", "avg", "--values", "[1,2,3]"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn injected_service_reaches_the_command() {
    argon()
        .args(["greet", "world"])
        .assert()
        .success()
        .stdout("Hello world\n");
}

#[test]
fn unknown_command_lists_alternatives() {
    argon()
        .arg("nope")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("command not found"))
        .stderr(predicate::str::contains("echo"));
}

#[test]
fn bad_value_reports_the_parameter() {
    argon()
        .args(["echo", "hi", "--repeat", "abc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("repeat"));
}

#[test]
fn range_violation_reports_and_fails() {
    argon()
        .args(["echo", "hi", "--repeat", "500"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("above the maximum"));
}

#[test]
fn unknown_argument_name_is_fatal() {
    argon()
        .args(["echo", "hi", "--nope", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("argument name not found"));
}
