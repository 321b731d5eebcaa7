//! Exports the forwarders under the genuine library's names.
//!
//! `winhttp.def` maps every public name onto the `proxy_<Name>` routine that
//! jumps through the forwarding table. MSVC receives one `/EXPORT` argument per
//! entry so the rustc generated module definition stays untouched.

use std::{env, fs};

const DEF_FILE: &str = "winhttp.def";

fn main() {
    println!("cargo:rerun-if-changed={DEF_FILE}");

    if env::var("CARGO_CFG_TARGET_OS").map_or(true, |os| os != "windows") {
        return;
    }

    if env::var("CARGO_CFG_TARGET_ENV").map_or(true, |target_env| target_env != "msvc") {
        println!("cargo:warning=Proxy exports are only wired up for MSVC targets");
        return;
    }

    let definitions = fs::read_to_string(DEF_FILE).expect("Failed to read module definition");

    for line in definitions.lines() {
        let Some(export) = parse_export(line) else {
            continue;
        };

        println!("cargo:rustc-cdylib-link-arg=/EXPORT:{export}");
    }
}

/// Converts a `Name=internal @N` definition line into `/EXPORT` syntax
fn parse_export(line: &str) -> Option<String> {
    let line = line.split(';').next()?.trim();
    if line.is_empty() || line == "EXPORTS" || line.starts_with("LIBRARY") {
        return None;
    }

    let mut parts = line.split_whitespace();
    let mut export = parts.next()?.to_string();

    for part in parts {
        if let Some(ordinal) = part.strip_prefix('@') {
            export.push_str(",@");
            export.push_str(ordinal);
        }
    }

    Some(export)
}
