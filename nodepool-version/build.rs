use std::env;
use std::process::Command;

fn main() {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    println!("cargo:rustc-env=NODEPOOL_RUSTC_VERSION={}", version);
    println!("cargo:rerun-if-env-changed=NODEPOOL_VERSION");
    println!("cargo:rerun-if-env-changed=NODEPOOL_GIT_COMMIT");
    println!("cargo:rerun-if-env-changed=NODEPOOL_BUILD_DATE");
}
