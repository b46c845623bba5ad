//! `cbor-pack` — encode JSON (stdin) to CBOR (stdout).
//!
//! Usage:
//!   cbor-pack < doc.json > doc.cbor

use std::io::{self, Read, Write};

use cborpack::cli::pack;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let result = pack(buf.trim()).and_then(|bytes| Ok(io::stdout().write_all(&bytes)?));
    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
