//! Build script for the jamcli playlist CLI.
//!
//! Copies the `.env.example` configuration template into the local data
//! directory (`<data_local_dir>/jamcli/.env.example`), next to the `.env`
//! file that `jamcli::config::load_env` reads at startup.

use std::{env, fs, path::PathBuf};

/// Copies the configuration template into the user's data directory.
///
/// A missing template only produces a cargo warning. Failing to create the
/// target directory or to write the copy fails the build.
///
/// Destinations:
/// - Linux: `~/.local/share/jamcli/.env.example`
/// - macOS: `~/Library/Application Support/jamcli/.env.example`
/// - Windows: `%LOCALAPPDATA%/jamcli/.env.example`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join(".env.example");

    let mut target_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    target_dir.push("jamcli");
    fs::create_dir_all(&target_dir)?;

    if !template.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            template.display()
        );
        return Ok(());
    }

    let contents = fs::read_to_string(&template)?;
    fs::write(target_dir.join(".env.example"), contents)?;

    Ok(())
}
