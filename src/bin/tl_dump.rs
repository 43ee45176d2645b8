//! Decode TL-serialized bytes against a schema and print them.
//!
//! Usage:
//!   tl_dump [OPTIONS] SCHEMA.tl [HEX ...]
//!   echo "15c4b51c 00000000" | tl_dump SCHEMA.tl
//!
//! Input is hex (whitespace ignored) from the arguments or stdin, or raw bytes
//! with `--file`. The buffer may hold several objects back to back; each is
//! decoded and printed in turn.
//!
//! Options:
//!   --type NAME    Read NAME (combinator or type) instead of dispatching on tags
//!   --file PATH    Read raw binary from PATH
//!   --summary, -s  One line per object
//!   --verbose, -v  Log every object at debug level (RUST_LOG still applies)

use anyhow::{anyhow, bail, Context};
use std::io::{self, Read};
use std::path::PathBuf;
use tlschema::dump::{hex_string, object_to_dump, value_summary_line};
use tlschema::{Codec, Value};
use tracing_subscriber::EnvFilter;

fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    match args.iter().position(|a| names.contains(&a.as_str())) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn take_value(args: &mut Vec<String>, name: &str) -> anyhow::Result<Option<String>> {
    match args.iter().position(|a| a == name) {
        Some(pos) => {
            args.remove(pos);
            if pos >= args.len() {
                bail!("{} needs an argument", name);
            }
            Ok(Some(args.remove(pos)))
        }
        None => Ok(None),
    }
}

fn decode_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_start_matches("0x")
        .to_string();
    if !digits.is_ascii() {
        bail!("input is not hex");
    }
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits");
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| anyhow!("bad hex at digit {}: {}", i, e)))
        .collect()
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = take_flag(&mut args, &["--verbose", "-v"]);
    let summary = take_flag(&mut args, &["--summary", "-s"]);
    let type_name = take_value(&mut args, "--type")?;
    let file = take_value(&mut args, "--file")?.map(PathBuf::from);

    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    if args.is_empty() {
        bail!("usage: tl_dump [--type NAME] [--file PATH] [-s] [-v] SCHEMA.tl [HEX ...]");
    }
    let schema_path = PathBuf::from(args.remove(0));
    let src = std::fs::read_to_string(&schema_path).with_context(|| format!("reading {}", schema_path.display()))?;
    let codec = Codec::compile(&src).context("compiling schema")?;

    let buf = match file {
        Some(path) => std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?,
        None if !args.is_empty() => decode_hex(&args.join(" "))?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("reading hex from stdin")?;
            decode_hex(&text)?
        }
    };

    let mut offset = 0usize;
    let mut count = 0u64;
    while offset < buf.len() {
        let (obj, used) = match codec.read_next(type_name.as_deref(), &buf, offset) {
            Ok(r) => r,
            Err(e) => {
                let end = (offset + 16).min(buf.len());
                eprintln!("offset {}: {} (next bytes: {})", offset, e, hex_string(&buf[offset..end]));
                std::process::exit(1);
            }
        };
        tracing::debug!(offset, bytes = used, object = %obj.name, "decoded");
        if summary {
            println!("{:6}  {}", offset, value_summary_line(&Value::from(obj)));
        } else {
            println!("{}", object_to_dump(&obj, 0));
        }
        offset += used;
        count += 1;
    }
    eprintln!("{} object(s), {} byte(s)", count, buf.len());
    Ok(())
}
