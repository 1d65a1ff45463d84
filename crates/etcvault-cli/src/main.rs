//! etcvault CLI — operator tooling for the local keychain.
//!
//! `keygen` creates keys (printed to stdout or saved into a keychain
//! directory), `keys` mirrors the proxy's `/_etcvault/keys` listing for a
//! local directory, and `transform` runs one value through the engine for
//! debugging and recovery.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use etcvault_core::{Engine, Key, Keychain};

/// etcvault — proxy for etcd, adding transparent encryption.
#[derive(Parser)]
#[command(
    name = "etcvault",
    version,
    about = "etcvault CLI — manage keychain keys and transform values",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new private key with the specified name.
    Keygen {
        /// Logical key name, stored in the PEM `Name` header.
        name: String,

        /// RSA key bit length to generate.
        #[arg(long, default_value_t = 2048)]
        bits: usize,

        /// Save the generated key into the specified keychain directory
        /// instead of printing it to stdout.
        #[arg(long, value_name = "DIR")]
        save: Option<PathBuf>,
    },

    /// List key names present in a keychain directory.
    Keys {
        /// Keychain directory.
        #[arg(long, env = "ETCVAULT_KEYCHAIN", default_value = "./keychain", value_name = "DIR")]
        keychain: PathBuf,

        /// Only names whose private half is locally present, i.e. the
        /// names the proxy will also be able to decrypt.
        #[arg(long)]
        encryption: bool,
    },

    /// Print the public half of a key as PEM, for distribution to proxies
    /// that should encrypt but never decrypt.
    Pubkey {
        /// Logical key name.
        name: String,

        /// Keychain directory.
        #[arg(long, env = "ETCVAULT_KEYCHAIN", default_value = "./keychain", value_name = "DIR")]
        keychain: PathBuf,
    },

    /// Run one value through the transformation engine: encrypt `plain`
    /// containers, decrypt V1 containers, pass anything else through.
    Transform {
        /// The value to transform.
        text: String,

        /// Keychain directory.
        #[arg(long, env = "ETCVAULT_KEYCHAIN", default_value = "./keychain", value_name = "DIR")]
        keychain: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Keygen { name, bits, save } => keygen(&name, bits, save.as_deref()),
        Command::Keys {
            keychain,
            encryption,
        } => list_keys(&keychain, encryption),
        Command::Pubkey { name, keychain } => pubkey(&name, &keychain),
        Command::Transform { text, keychain } => transform(&text, &keychain),
    }
}

fn keygen(name: &str, bits: usize, save: Option<&std::path::Path>) -> anyhow::Result<()> {
    let key = Key::generate(name, bits).context("key generation failed")?;

    match save {
        Some(dir) => {
            Keychain::new(dir)
                .save(&key)
                .with_context(|| format!("couldn't save key {name} into {}", dir.display()))?;
            eprintln!("saved {name}.pem into {}", dir.display());
        }
        None => {
            let pem = key
                .private_pem()
                .context("couldn't serialize generated key")?
                .context("generated key has no private half")?;
            print!("{pem}");
        }
    }

    Ok(())
}

fn list_keys(dir: &std::path::Path, encryption: bool) -> anyhow::Result<()> {
    let keychain = Keychain::new(dir);
    let names = if encryption {
        keychain.list_for_encryption()
    } else {
        keychain.list()
    }
    .with_context(|| format!("couldn't list keychain {}", dir.display()))?;

    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn pubkey(name: &str, dir: &std::path::Path) -> anyhow::Result<()> {
    let key = Keychain::new(dir)
        .find(name)
        .with_context(|| format!("couldn't find key {name} in {}", dir.display()))?;
    let pem = key
        .public_pem()
        .with_context(|| format!("couldn't serialize public half of {name}"))?;
    print!("{pem}");
    Ok(())
}

fn transform(text: &str, dir: &std::path::Path) -> anyhow::Result<()> {
    let engine = Engine::new(Arc::new(Keychain::new(dir)));
    let result = engine.transform(text).context("transform failed")?;
    println!("{result}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn keygen_saves_into_a_keychain() {
        let dir = tempfile::TempDir::new().unwrap();

        keygen("unit", 1024, Some(dir.path())).unwrap();

        assert!(dir.path().join("unit.pem").exists());
        let keychain = Keychain::new(dir.path());
        assert_eq!(keychain.list().unwrap(), vec!["unit"]);
        assert_eq!(keychain.list_for_encryption().unwrap(), vec!["unit"]);
    }

    #[test]
    fn keygen_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();

        keygen("unit", 1024, Some(dir.path())).unwrap();
        assert!(keygen("unit", 1024, Some(dir.path())).is_err());
    }

    #[test]
    fn pubkey_prints_only_the_public_half() {
        let dir = tempfile::TempDir::new().unwrap();
        keygen("unit", 1024, Some(dir.path())).unwrap();

        let key = Keychain::new(dir.path()).find("unit").unwrap();
        let pem = key.public_pem().unwrap();

        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(pem.contains("Name: unit"));

        let reloaded = Key::from_pem(pem.as_bytes()).unwrap();
        assert!(reloaded.private.is_none());
    }

    #[test]
    fn generated_keys_round_trip_through_the_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        keygen("unit", 1024, Some(dir.path())).unwrap();

        let engine = Engine::new(Arc::new(Keychain::new(dir.path())));
        let encrypted = engine
            .transform("ETCVAULT::plain:unit:hello::ETCVAULT")
            .unwrap();
        assert!(encrypted.starts_with("ETCVAULT::1:unit::"));
        assert_eq!(engine.transform(&encrypted).unwrap(), "hello");
    }
}
