//! `cbor-unpack` — decode a CBOR sequence (stdin) to JSON lines (stdout).
//!
//! Usage:
//!   cbor-unpack [--pretty] [--symbolize-keys] [--max-depth N] [--max-length N]

use std::io::{self, Read, Write};

use cborpack::cli::{unpack, UnpackArgs};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = match UnpackArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let mut buf = Vec::new();
    if let Err(e) = io::stdin().read_to_end(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let result = unpack(&buf, &args).and_then(|json| Ok(io::stdout().write_all(json.as_bytes())?));
    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
