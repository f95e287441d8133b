//! Process environment: client variables, the current user and the rc and
//! history file locations.
use crate::core::{Result, UniqlError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the rc file location.
pub const RC_FILE_VAR: &str = "UNIQLRC";
/// Environment variable overriding the history file location.
pub const HISTORY_FILE_VAR: &str = "UNIQL_HISTORY";

const DEFAULT_RC_FILE: &str = ".uniqlrc";
const DEFAULT_HISTORY_FILE: &str = ".uniql_history";

pub trait VariableStore {
    fn set(&mut self, key: &str, value: &str);
    fn unset(&mut self, key: &str);
    fn get(&self, key: &str) -> Option<&str>;
}

/// Client variables set with `-v` or `\set`.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    vars: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl VariableStore for Variables {
    fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    fn unset(&mut self, key: &str) {
        self.vars.remove(key);
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Applies `NAME=VALUE` overrides; a bare `NAME` unsets the variable.
pub fn apply_overrides(store: &mut dyn VariableStore, overrides: &[String]) {
    for item in overrides {
        match item.split_once('=') {
            Some((key, value)) => store.set(key, value),
            None => store.unset(item),
        }
    }
}

/// Name of the operating system user running the process.
pub fn current_user() -> Result<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|user| !user.is_empty())
        .or_else(|| {
            dirs::home_dir()
                .and_then(|home| home.file_name().map(|n| n.to_string_lossy().to_string()))
        })
        .ok_or_else(|| UniqlError::Config("cannot determine current user".to_string()))
}

/// Resolves a per-user file: the environment variable wins, then the
/// configured path, then `default_name` in the home directory.
fn user_file(var: &str, configured: Option<&str>, default_name: &str, home: Option<&Path>) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(var) {
        return (!path.is_empty()).then(|| PathBuf::from(path));
    }
    if let Some(path) = configured {
        return Some(expand_home(path, home));
    }
    home.map(|home| home.join(default_name))
}

fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Location of the rc file. Setting `UNIQLRC` to an empty string disables it.
pub fn rc_file(configured: Option<&str>) -> Option<PathBuf> {
    user_file(RC_FILE_VAR, configured, DEFAULT_RC_FILE, dirs::home_dir().as_deref())
}

/// Location of the interactive history file.
pub fn history_file(configured: Option<&str>) -> Option<PathBuf> {
    user_file(
        HISTORY_FILE_VAR,
        configured,
        DEFAULT_HISTORY_FILE,
        dirs::home_dir().as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let mut vars = Variables::new();
        vars.set("keep", "1");
        vars.set("drop", "1");
        apply_overrides(
            &mut vars,
            &["a=1".to_string(), "drop".to_string(), "b=x=y".to_string()],
        );
        assert_eq!(vars.get("a"), Some("1"));
        assert_eq!(vars.get("b"), Some("x=y"));
        assert_eq!(vars.get("drop"), None);
        assert_eq!(vars.get("keep"), Some("1"));
        assert_eq!(
            vars.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["a", "b", "keep"]
        );
    }

    #[test]
    fn test_user_file_resolution() {
        let home = Path::new("/home/alice");
        let var = "UNIQL_TEST_UNSET_VARIABLE";
        assert_eq!(
            user_file(var, None, ".uniqlrc", Some(home)),
            Some(PathBuf::from("/home/alice/.uniqlrc"))
        );
        assert_eq!(
            user_file(var, Some("~/conf/rc.sql"), ".uniqlrc", Some(home)),
            Some(PathBuf::from("/home/alice/conf/rc.sql"))
        );
        assert_eq!(
            user_file(var, Some("/etc/uniqlrc"), ".uniqlrc", Some(home)),
            Some(PathBuf::from("/etc/uniqlrc"))
        );
        assert_eq!(user_file(var, None, ".uniqlrc", None), None);
    }
}
