use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

/// A `kw` command bound to a private tool home.
pub fn kw_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kw"));
    cmd.arg("--home").arg(home);
    cmd.env_remove("KEYWARD_HOME");
    cmd.env_remove("RUST_LOG");
    cmd
}

pub fn kw(home: &Path, args: &[&str]) -> Output {
    kw_bin(home).args(args).output().expect("failed to run kw")
}

/// Run kw, assert exit code, return parsed JSON stdout.
pub fn kw_json(home: &Path, args: &[&str], expected_exit: i32) -> Value {
    let out = kw(home, args);
    let code = out.status.code().unwrap_or(-1);
    assert_eq!(
        code,
        expected_exit,
        "exit mismatch for: kw {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "invalid JSON from: kw {}\n{e}\nstdout: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stdout)
        )
    })
}

/// Run kw expecting success, return stderr (status lines go there).
pub fn kw_ok(home: &Path, args: &[&str]) -> String {
    let out = kw(home, args);
    assert!(
        out.status.success(),
        "kw {} failed with exit {}\nstderr: {}",
        args.join(" "),
        out.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}

/// Run kw expecting failure, return stderr.
pub fn kw_err(home: &Path, args: &[&str]) -> String {
    let out = kw(home, args);
    assert!(
        !out.status.success(),
        "kw {} unexpectedly succeeded\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout)
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}

/// Home with operator `O` and the given accounts.
#[allow(dead_code)]
pub fn home_with_accounts(accounts: &[&str]) -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    kw_ok(home.path(), &["add", "operator", "--name", "O"]);
    for account in accounts {
        kw_ok(home.path(), &["add", "account", "--name", account]);
    }
    home
}

/// Stdout lines of a successful run.
#[allow(dead_code)]
pub fn kw_lines(home: &Path, args: &[&str]) -> Vec<String> {
    let out = kw(home, args);
    assert!(out.status.success(), "kw {} failed", args.join(" "));
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(String::from)
        .collect()
}
