//! Embeds the short commit hash shown by `critmark --version`.

use std::process::Command;

fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let commit = short_commit().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_HASH={commit}");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
