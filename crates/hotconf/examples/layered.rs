//! Layered configuration example.
//!
//! Parses a base file and a local override, merges them so the override
//! wins, and edits the result in memory.
//!
//! # Running
//!
//! ```bash
//! cargo run --example layered
//! ```

use hotconf::{ComposedDocNode, DocNode, deep_merge, parse_str};

const BASE: &str = "\
server:
  host: localhost
  port: 80
features: [login, search]
";

const LOCAL: &str = "\
server:
  port: 8080
features: [debug-panel]
";

fn main() -> miette::Result<()> {
    let base = parse_str(BASE, "base.yaml")?;
    let local = parse_str(LOCAL, "local.yaml")?;

    let merged = deep_merge(&base, &local)?;
    println!("merged:   {merged}");
    println!("provenance: {}", merged.source_information());

    let port = merged.get("server")?.get("port")?.into_owned();
    println!("port {} from {}", port.string_value()?, port.source_information());

    let mut edited = ComposedDocNode::deep_clone(&merged)?;
    edited
        .get_mut("server")?
        .set("tls", ComposedDocNode::scalar("on").into())?;
    println!("edited:   {}", DocNode::from(edited));

    // A type clash is reported with both origins
    let clash = parse_str("server: [a, b]", "clash.yaml")?;
    if let Err(err) = deep_merge(&base, &clash) {
        println!("{:?}", miette::Report::from(err));
    }

    Ok(())
}
