//! Log level definitions and the process-wide level registry
//!
//! A [`Level`] is a named severity. Ordering only looks at the severity, so a
//! `CUSTOM` level built from a raw number compares exactly like a registered
//! level carrying the same number.
//!
//! The registry is append-only: names can be added at any time but never
//! removed or rebound to another severity.

use super::error::{LoggerError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

/// Name given to levels built from a bare severity value
pub const CUSTOM_LEVEL_NAME: &str = "CUSTOM";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    name: Cow<'static, str>,
    severity: u32,
}

impl Level {
    pub const TRACE: Level = Level::builtin("TRACE", 5);
    pub const DEBUG: Level = Level::builtin("DEBUG", 10);
    pub const INFO: Level = Level::builtin("INFO", 20);
    pub const WARN: Level = Level::builtin("WARN", 30);
    pub const ERROR: Level = Level::builtin("ERROR", 40);
    pub const FATAL: Level = Level::builtin("FATAL", 50);

    const fn builtin(name: &'static str, severity: u32) -> Self {
        Self {
            name: Cow::Borrowed(name),
            severity,
        }
    }

    /// Create a named level. Names are stored upper-cased.
    pub fn new(name: impl Into<String>, severity: u32) -> Self {
        Self {
            name: Cow::Owned(name.into().to_uppercase()),
            severity,
        }
    }

    /// Wrap a raw severity into an ad-hoc `CUSTOM` level
    pub const fn custom(severity: u32) -> Self {
        Self::builtin(CUSTOM_LEVEL_NAME, severity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn severity(&self) -> u32 {
        self.severity
    }

    pub fn is_custom(&self) -> bool {
        self.name == CUSTOM_LEVEL_NAME
    }

    /// Whether a record at this level passes the given threshold
    #[inline]
    pub fn meets(&self, threshold: &Level) -> bool {
        self.severity >= threshold.severity
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self.severity {
            s if s >= Level::FATAL.severity => BrightRed,
            s if s >= Level::ERROR.severity => Red,
            s if s >= Level::WARN.severity => Yellow,
            s if s >= Level::INFO.severity => Green,
            s if s >= Level::DEBUG.severity => Blue,
            _ => BrightBlack,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::TRACE
    }
}

// Equality and hashing must agree with `Ord`, which is severity-first.
impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.severity == other.severity && self.name == other.name
    }
}

impl Eq for Level {}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.severity.hash(state);
        self.name.hash(state);
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    /// Resolve through the global registry
    fn from_str(s: &str) -> Result<Self> {
        get_level(s)
    }
}

fn registry() -> &'static RwLock<HashMap<String, Level>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Level>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let builtins = [
            Level::TRACE,
            Level::DEBUG,
            Level::INFO,
            Level::WARN,
            Level::ERROR,
            Level::FATAL,
        ];
        let mut map: HashMap<String, Level> = builtins
            .into_iter()
            .map(|level| (level.name().to_string(), level))
            .collect();
        map.insert("WARNING".to_string(), Level::WARN);
        RwLock::new(map)
    })
}

/// Register a level process-wide.
///
/// Registering the same name and severity twice is a no-op; rebinding a name
/// to a different severity fails with [`LoggerError::LevelConflict`].
pub fn add_level(level: Level) -> Result<()> {
    let key = level.name().to_uppercase();
    let mut levels = registry().write();
    if let Some(existing) = levels.get(&key) {
        if existing.severity != level.severity {
            return Err(LoggerError::LevelConflict {
                name: key,
                existing: existing.severity,
                requested: level.severity,
            });
        }
        return Ok(());
    }
    levels.insert(key, level);
    Ok(())
}

/// Look up a level by name, ignoring case
pub fn get_level(name: &str) -> Result<Level> {
    registry()
        .read()
        .get(&name.to_uppercase())
        .cloned()
        .ok_or_else(|| LoggerError::level_not_found(name))
}

/// Snapshot of every registered level, sorted by severity
pub fn registered_levels() -> Vec<Level> {
    let mut levels: Vec<Level> = registry().read().values().cloned().collect();
    levels.sort();
    levels.dedup();
    levels
}

/// Anything a log call accepts as its level: a [`Level`], a registered name or
/// a bare severity
pub trait IntoLevel {
    fn into_level(self) -> Result<Level>;
}

impl IntoLevel for Level {
    fn into_level(self) -> Result<Level> {
        Ok(self)
    }
}

impl IntoLevel for &Level {
    fn into_level(self) -> Result<Level> {
        Ok(self.clone())
    }
}

impl IntoLevel for &str {
    fn into_level(self) -> Result<Level> {
        get_level(self)
    }
}

impl IntoLevel for String {
    fn into_level(self) -> Result<Level> {
        get_level(&self)
    }
}

impl IntoLevel for &String {
    fn into_level(self) -> Result<Level> {
        get_level(self)
    }
}

/// A registered level with that severity if there is one, else `CUSTOM`
impl IntoLevel for u32 {
    fn into_level(self) -> Result<Level> {
        let registered = registry()
            .read()
            .values()
            .filter(|level| level.severity == self)
            .min()
            .cloned();
        Ok(registered.unwrap_or_else(|| Level::custom(self)))
    }
}
