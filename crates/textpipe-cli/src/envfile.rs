//! Optional `KEY=VALUE` env-file loading.
//!
//! `TEXTPIPE_ENV_FILE` names the file; otherwise `.env` in the working directory is used
//! when it exists. Variables already present in the process environment win, and values
//! are never logged.

use std::path::{Path, PathBuf};

pub const ENV_FILE_VAR: &str = "TEXTPIPE_ENV_FILE";

/// Parse env-file text into ordered `(key, value)` pairs.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is allowed, and a value
/// wrapped in matching single or double quotes is unwrapped.
pub fn parse(txt: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let s = s.strip_prefix("export ").unwrap_or(s);
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        out.push((k.to_string(), unquote(v.trim()).to_string()));
    }
    out
}

fn unquote(v: &str) -> &str {
    for q in ['"', '\''] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

fn default_path() -> Option<PathBuf> {
    match std::env::var(ENV_FILE_VAR) {
        Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p.trim())),
        _ => {
            let p = PathBuf::from(".env");
            p.is_file().then_some(p)
        }
    }
}

/// Load the env file, if any. Returns the number of variables that were set.
pub fn load() -> usize {
    let Some(path) = default_path() else {
        return 0;
    };
    load_from(&path)
}

pub fn load_from(path: &Path) -> usize {
    let Ok(txt) = std::fs::read_to_string(path) else {
        return 0;
    };
    let mut set = 0;
    for (k, v) in parse(&txt) {
        // Don't override explicit process env.
        if std::env::var_os(&k).is_none() {
            std::env::set_var(&k, v);
            set += 1;
        }
    }
    set
}
