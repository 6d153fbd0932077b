use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Flat `key = value` configuration with `#` comments. Loaded once at
/// process start and read-only afterwards.
#[derive(Debug, Default)]
pub struct Config {
    entries: HashMap<String, String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot open config file: {}", path.display()))?;

        let mut entries = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        tracing::info!(count = entries.len(), "loaded config items");
        Ok(Self { entries })
    }

    /// Value for `key`, with empty values treated as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_key_value_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.conf");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "# search engine config").unwrap();
        writeln!(f, "index_path = /var/lib/search/index.dat").unwrap();
        writeln!(f, "server_port=8080").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "broken line without equals").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.get("index_path"), Some("/var/lib/search/index.dat"));
        assert_eq!(config.get("server_port"), Some("8080"));
        assert_eq!(config.get("missing"), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/search.conf").is_err());
    }
}
