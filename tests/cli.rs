use assert_cmd::Command;

const BIN: &str = "substrate-state-inspector";

/// Nothing here should need a node; point at one that can't exist just in case.
const NO_NODE: &str = "ws://127.0.0.1:1";

fn run_failing(args: &[&str]) -> String {
    let assert = Command::cargo_bin(BIN)
        .unwrap()
        .env("RUST_LOG", "off")
        .args(args)
        .assert()
        .failure()
        .code(1);
    let output = assert.get_output();
    assert!(output.stdout.is_empty(), "unexpected stdout: {:?}", output.stdout);
    String::from_utf8(output.stderr.clone()).unwrap()
}

#[test]
fn no_command_fails() {
    let stderr = run_failing(&[]);
    assert!(stderr.contains("No command given"), "{stderr}");
}

#[test]
fn unknown_command_lists_the_valid_ones() {
    let stderr = run_failing(&["foo"]);
    assert!(stderr.contains("Unknown command 'foo'"), "{stderr}");
    assert!(stderr.contains("decode-blocks"), "{stderr}");
    assert!(stderr.contains("decode-storage-items"), "{stderr}");
}

#[test]
fn missing_block_fails_before_connecting() {
    let stderr = run_failing(&["decode-blocks", "--url", NO_NODE]);
    assert!(stderr.contains("--block"), "{stderr}");

    let stderr = run_failing(&["decode-storage-items", "--url", NO_NODE, "--entry", "Babe.Authorities"]);
    assert!(stderr.contains("--block"), "{stderr}");
}

#[test]
fn malformed_entry_fails_before_connecting() {
    let stderr = run_failing(&[
        "decode-storage-items",
        "--url",
        NO_NODE,
        "--block",
        "1",
        "--entry",
        "BabeAuthorities",
    ]);
    assert!(stderr.contains("Cannot parse storage entry 'BabeAuthorities'"), "{stderr}");
}

#[test]
fn unreachable_node_fails() {
    let stderr = run_failing(&["decode-blocks", "--url", NO_NODE, "--block", "1"]);
    assert!(stderr.contains("Could not connect to ws://127.0.0.1:1"), "{stderr}");
}

#[test]
fn command_help_succeeds() {
    let assert = Command::cargo_bin(BIN)
        .unwrap()
        .args(["decode-storage-items", "--help"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("--entry"), "{stdout}");
}

#[cfg(unix)]
#[test]
fn non_utf8_arguments_are_a_usage_error() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let assert = Command::cargo_bin(BIN)
        .unwrap()
        .env("RUST_LOG", "off")
        .arg(OsStr::from_bytes(b"decode-\xffblocks"))
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("Unknown command 'decode-\u{FFFD}blocks'"), "{stderr}");
}
