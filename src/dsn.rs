//! Connection string handling.
//!
//! A DSN has the form `name://params`. Only the backend name is interpreted;
//! `params` are handed to the backend's connector untouched, except when a
//! prompted password has to be injected into the user info.
use crate::core::{Result, UniqlError};

/// Splits a DSN into the backend name and the opaque connection parameters.
pub fn split(dsn: &str) -> Result<(&str, &str)> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return Err(UniqlError::MissingDsn);
    }
    let (name, params) = dsn
        .split_once("://")
        .ok_or_else(|| UniqlError::InvalidDsn(dsn.to_string()))?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' || c == '_');
    if !valid {
        return Err(UniqlError::InvalidDsn(dsn.to_string()));
    }
    Ok((name, params))
}

/// Splits connection parameters into `(user info, rest)`.
fn user_info(params: &str) -> (Option<&str>, &str) {
    let authority_end = params.find('/').unwrap_or(params.len());
    match params[..authority_end].rfind('@') {
        Some(at) => (Some(&params[..at]), &params[at + 1..]),
        None => (None, params),
    }
}

/// User name embedded in a DSN, if any.
pub fn username(dsn: &str) -> Option<String> {
    let (_, params) = split(dsn).ok()?;
    let (info, _) = user_info(params);
    info.and_then(|info| info.split(':').next())
        .filter(|user| !user.is_empty())
        .map(str::to_string)
}

/// Returns `dsn` with `password` set in its user info. The DSN's own user
/// is kept; `default_user` is used when it has none.
pub fn with_password(dsn: &str, default_user: &str, password: &str) -> Result<String> {
    let (name, params) = split(dsn)?;
    let (info, rest) = user_info(params);
    let user = info
        .and_then(|info| info.split(':').next())
        .filter(|user| !user.is_empty())
        .unwrap_or(default_user);
    Ok(format!(
        "{}://{}:{}@{}",
        name,
        user,
        escape_user_info(password),
        rest
    ))
}

fn escape_user_info(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' | ':' | '@' | '/' | '?' | '#' => escaped.push_str(&format!("%{:02X}", c as u32)),
            _ => escaped.push(c),
        }
    }
    escaped
}
