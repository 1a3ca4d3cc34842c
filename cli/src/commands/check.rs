//! Check Command
//!
//! Verify checksums from file (like md5sum -c).

use anyhow::{Context, Result};
use md5x::Server;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

// =============================================================================
// CHECK
// =============================================================================

/// Verify checksums from a checksum file.
pub fn check_mode(checksum_file: &PathBuf) -> Result<()> {
    let file = File::open(checksum_file)
        .with_context(|| format!("Failed to open: {}", checksum_file.display()))?;

    let server = Server::new();
    let reader = BufReader::new(file);
    let mut total = 0;
    let mut failed = 0;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Format: "hash  filename" (two spaces)
        let parts: Vec<&str> = line.splitn(2, "  ").collect();
        if parts.len() != 2 {
            eprintln!("Warning: Invalid format: {}", line);
            continue;
        }

        let expected_hash = parts[0].trim();
        let file_path = parts[1].trim();
        total += 1;

        match verify_file(&server, file_path, expected_hash) {
            Ok(true) => println!("{}: OK", file_path),
            Ok(false) => {
                println!("{}: FAILED", file_path);
                failed += 1;
            }
            Err(e) => {
                println!("{}: FAILED ({})", file_path, e);
                failed += 1;
            }
        }
    }

    println!();
    if failed == 0 {
        println!("All {} checksums verified", total);
    } else {
        eprintln!("WARNING: {} of {} checksums did NOT match", failed, total);
        std::process::exit(1);
    }

    Ok(())
}

fn verify_file(server: &Server, path: &str, expected_hash: &str) -> Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = server.new_hash();
    let mut buffer = [0u8; 128 * 1024];

    loop {
        let n = std::io::Read::read(&mut file, &mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.write(&buffer[..n])?;
    }

    let actual_hash = hex::encode(hasher.sum_digest()?);
    Ok(actual_hash.eq_ignore_ascii_case(expected_hash))
}
