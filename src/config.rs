//! Per-project `config.json`: include/exclude globs, gitignore policy, size and
//! count thresholds. Unrecognized underscore-prefixed keys are preserved verbatim
//! as self-documentation; any other unknown key rejects the file and the loader
//! falls back to defaults with a warning.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;

const KNOWN_KEYS: &[&str] = &[
    "include",
    "exclude",
    "respectGitignore",
    "maxFileSize",
    "maxFiles",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
    pub max_file_size: ByteSize,
    pub max_files: usize,
    /// Underscore-prefixed keys, preserved verbatim across load/save round-trips.
    pub extra: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            respect_gitignore: true,
            max_file_size: ByteSize(1024 * 1024),
            max_files: 50_000,
            extra: BTreeMap::new(),
        }
    }
}

/// A byte count parsed from and rendered back to a `^\d+(KB|MB)$` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn bytes(self) -> u64 {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self> {
        let err = || Error::InvalidPattern {
            pattern: s.to_string(),
            reason: "expected digits followed by KB or MB".to_string(),
        };
        let (digits, unit) = if let Some(d) = s.strip_suffix("KB") {
            (d, 1024u64)
        } else if let Some(d) = s.strip_suffix("MB") {
            (d, 1024 * 1024)
        } else {
            return Err(err());
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let n: u64 = digits.parse().map_err(|_| err())?;
        Ok(ByteSize(n * unit))
    }
}

impl Serialize for ByteSize {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Round-trip as whole MB when possible, otherwise whole KB; matches the
        // default "1MB" shape and keeps config.json human-editable.
        let s = if self.0 % (1024 * 1024) == 0 {
            format!("{}MB", self.0 / (1024 * 1024))
        } else {
            format!("{}KB", self.0 / 1024)
        };
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ByteSize::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Config {
    /// Load from `path`, or return `Config::default()` (logged at warn) if the file
    /// is missing, malformed, or carries an unrecognized key.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "falling back to default config");
                Config::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| Error::IndexCorrupt {
            reason: "config.json is not a JSON object".to_string(),
            source: None,
        })?;

        let mut extra = BTreeMap::new();
        for (key, val) in obj {
            if key.starts_with('_') {
                extra.insert(key.clone(), val.clone());
                continue;
            }
            if !KNOWN_KEYS.contains(&key.as_str()) {
                return Err(Error::IndexCorrupt {
                    reason: format!("unrecognized config key: {key}"),
                    source: None,
                });
            }
        }

        let include = obj
            .get("include")
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()?
            .unwrap_or_default();
        let exclude = obj
            .get("exclude")
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()?
            .unwrap_or_default();
        let respect_gitignore = obj
            .get("respectGitignore")
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()?
            .unwrap_or(true);
        let max_file_size = obj
            .get("maxFileSize")
            .map(|v| serde_json::from_value::<ByteSize>(v.clone()))
            .transpose()?
            .unwrap_or(ByteSize(1024 * 1024));
        let max_files = obj
            .get("maxFiles")
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()?
            .unwrap_or(50_000usize);

        Ok(Config {
            include,
            exclude,
            respect_gitignore,
            max_file_size,
            max_files,
            extra,
        })
    }

    /// Serialize back to `config.json`. Recognized keys are rendered byte-for-byte
    /// stable across load/save when unchanged; `extra` keys are emitted verbatim.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut obj = serde_json::Map::new();
        obj.insert("include".to_string(), serde_json::to_value(&self.include)?);
        obj.insert("exclude".to_string(), serde_json::to_value(&self.exclude)?);
        obj.insert(
            "respectGitignore".to_string(),
            serde_json::to_value(self.respect_gitignore)?,
        );
        obj.insert(
            "maxFileSize".to_string(),
            serde_json::to_value(self.max_file_size)?,
        );
        obj.insert("maxFiles".to_string(), serde_json::to_value(self.max_files)?);
        for (key, val) in &self.extra {
            obj.insert(key.clone(), val.clone());
        }
        let text = serde_json::to_string_pretty(&Value::Object(obj))?;
        crate::paths::atomic_write(path, text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
