//! Token file persistence. The bearer token is the only client state that
//! survives a restart; everything else is refetched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TOKEN_FILE_ENV: &str = "CTF_TOKEN_FILE";

/// Resolve the token file path: `$CTF_TOKEN_FILE`, else
/// `$HOME/.ctf-console/token`, else a path relative to the working directory.
pub fn default_token_path() -> PathBuf {
    if let Ok(path) = std::env::var(TOKEN_FILE_ENV) {
        return PathBuf::from(path);
    }
    match std::env::var("HOME") {
        Ok(home) => Path::new(&home).join(".ctf-console").join("token"),
        Err(_) => PathBuf::from(".ctf-console/token"),
    }
}

pub fn save_token(path: &Path, token: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, token)
}

pub fn load_token(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let token = raw.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub fn clear_token(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
