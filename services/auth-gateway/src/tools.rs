//! Command-line parsing and operator subcommands
//!
//! ```text
//! session-gateway [serve] [--config <path>]
//! session-gateway hash-password [<plaintext>] [--cost <n>]
//! session-gateway verify-password <hash> [<plaintext>]
//! session-gateway generate-secret
//! ```
//!
//! When the plaintext is omitted it is read from the first line of stdin,
//! which keeps passwords out of shell history.

use std::io::BufRead;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use credentials::{BCRYPT_COST, BcryptHasher, PasswordHasher};
use rand::RngExt;

/// Bytes of entropy in a generated signing secret.
const SECRET_BYTES: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Serve { config: Option<String> },
    HashPassword { plaintext: Option<String>, cost: u32 },
    VerifyPassword { digest: String, plaintext: Option<String> },
    GenerateSecret,
}

/// Parse process arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let config = args
        .iter()
        .position(|a| a == "--config")
        .map(|i| {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| "--config requires a path".to_string())
        })
        .transpose()?;

    let cost = args
        .iter()
        .position(|a| a == "--cost")
        .map(|i| {
            args.get(i + 1)
                .and_then(|v| v.parse::<u32>().ok())
                .ok_or_else(|| "--cost requires a number".to_string())
        })
        .transpose()?
        .unwrap_or(BCRYPT_COST);

    let positional: Vec<&String> = {
        let mut out = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--config" || arg == "--cost" {
                iter.next();
            } else {
                out.push(arg);
            }
        }
        out
    };

    match positional.as_slice() {
        [] => Ok(Command::Serve { config }),
        [cmd] if cmd.as_str() == "serve" => Ok(Command::Serve { config }),
        [cmd, rest @ ..] if cmd.as_str() == "hash-password" && rest.len() <= 1 => {
            Ok(Command::HashPassword {
                plaintext: rest.first().map(|s| s.to_string()),
                cost,
            })
        }
        [cmd, digest, rest @ ..] if cmd.as_str() == "verify-password" && rest.len() <= 1 => {
            Ok(Command::VerifyPassword {
                digest: digest.to_string(),
                plaintext: rest.first().map(|s| s.to_string()),
            })
        }
        [cmd] if cmd.as_str() == "generate-secret" => Ok(Command::GenerateSecret),
        _ => Err(format!(
            "unrecognized arguments: {}",
            positional
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        )),
    }
}

fn read_plaintext(plaintext: Option<String>) -> anyhow::Result<String> {
    if let Some(p) = plaintext {
        return Ok(p);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if line.is_empty() {
        anyhow::bail!("no password given on the command line or stdin");
    }
    Ok(line)
}

/// Print a bcrypt hash suitable for a `[[seed_users]]` entry.
pub fn hash_password(plaintext: Option<String>, cost: u32) -> anyhow::Result<String> {
    let plaintext = read_plaintext(plaintext)?;
    let hasher = BcryptHasher::new(cost)?;
    Ok(hasher.hash(&plaintext)?)
}

pub fn verify_password(digest: &str, plaintext: Option<String>) -> anyhow::Result<bool> {
    let plaintext = read_plaintext(plaintext)?;
    Ok(BcryptHasher::default().verify(digest, &plaintext))
}

/// Random URL-safe secret for ACCESS_TOKEN_SECRET / REFRESH_TOKEN_SECRET.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
