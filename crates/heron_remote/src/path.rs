//! Helpers for building POSIX paths and shell commands for the remote host.

/// Single-quotes `s` for a POSIX shell.
pub fn sh_quote(s: &str) -> String {
    let mut out = String::from("'");
    out.push_str(&s.replace('\'', r"'\''"));
    out.push('\'');
    out
}

/// Converts Windows separators to `/`.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

pub fn join(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches("./");
    if base.is_empty() {
        return rel.to_string();
    }
    if rel.starts_with('/') {
        return rel.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), rel)
}

/// Expands a leading `~` (and only a leading one) to `home`.
pub fn expand_home(path: &str, home: &str) -> String {
    if path == "~" {
        return home.to_string();
    }
    match path.strip_prefix("~/") {
        Some(rest) => join(home, rest),
        None => path.to_string(),
    }
}
