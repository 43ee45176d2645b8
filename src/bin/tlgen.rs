//! Compile TL schema files into a Rust module.
//!
//! Usage:
//!   tlgen [OPTIONS] SCHEMA.tl [SCHEMA.tl ...]
//!   tlgen [OPTIONS] < schema.tl
//!
//! Multiple schema files are concatenated in the order given, so a later file
//! may use types declared in an earlier one.
//!
//! Options:
//!   -o, --out FILE     Write the module to FILE instead of stdout
//!   --runtime PATH     Runtime crate path used by the generated code (default: tlschema)
//!   --no-docs          Omit doc comments
//!   --check            Compile the schema and report a summary; emit nothing
//!
//! Logging goes to stderr and follows RUST_LOG (default: warn).

use anyhow::{bail, Context};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tlschema::{generate, GeneratorOptions, Schema};
use tracing_subscriber::EnvFilter;

struct Args {
    inputs: Vec<PathBuf>,
    out: Option<PathBuf>,
    options: GeneratorOptions,
    check: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut raw: Vec<String> = std::env::args().skip(1).collect();
    let mut options = GeneratorOptions::default();
    let mut out = None;
    let mut check = false;
    let mut inputs = Vec::new();
    let mut iter = raw.drain(..);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--out" => {
                let path = iter.next().context("--out needs a file argument")?;
                out = Some(PathBuf::from(path));
            }
            "--runtime" => {
                options.runtime_path = iter.next().context("--runtime needs a crate path")?;
            }
            "--no-docs" => options.emit_docs = false,
            "--check" => check = true,
            "-h" | "--help" => {
                eprintln!("usage: tlgen [-o FILE] [--runtime PATH] [--no-docs] [--check] [SCHEMA.tl ...]");
                std::process::exit(0);
            }
            s if s.starts_with('-') && s != "-" => bail!("unknown option `{}`", s),
            _ => inputs.push(PathBuf::from(arg)),
        }
    }
    Ok(Args {
        inputs,
        out,
        options,
        check,
    })
}

fn read_sources(inputs: &[PathBuf]) -> anyhow::Result<String> {
    if inputs.is_empty() || inputs.iter().all(|p| p.as_os_str() == "-") {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src).context("reading schema from stdin")?;
        return Ok(src);
    }
    let mut src = String::new();
    for path in inputs {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loaded schema");
        src.push_str(&text);
        if !src.ends_with('\n') {
            src.push('\n');
        }
    }
    Ok(src)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    let src = read_sources(&args.inputs)?;
    let schema = Schema::compile(&src).context("compiling schema")?;

    if args.check {
        let functions = schema.functions().count();
        eprintln!(
            "{} combinator(s): {} constructor(s), {} function(s), {} union(s)",
            schema.combinators().len(),
            schema.combinators().len() - functions,
            functions,
            schema.unions().count()
        );
        return Ok(());
    }

    let module = generate(&schema, &args.options).context("generating Rust module")?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &module).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = module.len(), "wrote module");
        }
        None => io::stdout().write_all(module.as_bytes())?,
    }
    Ok(())
}
