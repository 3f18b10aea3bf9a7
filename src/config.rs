use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RtConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub collapse: CollapseConfig,
    #[serde(default)]
    pub observe: ObserveConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// [storage] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prefix of every storage key
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Where review state files live (defaults to the platform data dir)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// [collapse] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapseConfig {
    /// Glob patterns of generated files that start collapsed
    #[serde(default = "default_lock_patterns")]
    pub lock_patterns: Vec<String>,
}

/// [observe] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserveConfig {
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// [bootstrap] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce applied to snapshot file events
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_namespace() -> String {
    "review-tree".to_string()
}

fn default_lock_patterns() -> Vec<String> {
    vec!["*.lock*".into(), "*-lock".into()]
}

fn default_quiet_window_ms() -> u64 {
    15_000
}

fn default_poll_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            dir: None,
        }
    }
}

impl Default for CollapseConfig {
    fn default() -> Self {
        Self {
            lock_patterns: default_lock_patterns(),
        }
    }
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            quiet_window_ms: default_quiet_window_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl ObserveConfig {
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl BootstrapConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Global config path (`~/.config/rtree/config.toml` on Linux)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rtree/config.toml"))
}

/// Load config by merging global defaults with local overrides.
/// Priority: `local` (`.rtree.toml` unless given) > global config > built-in defaults.
/// Merging is deep: individual fields within sections override independently.
pub fn load_config(local: Option<&Path>) -> RtConfig {
    let local_path = local
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".rtree.toml"));
    load_config_from(global_config_path().as_deref(), &local_path)
}

fn load_config_from(global_path: Option<&Path>, local_path: &Path) -> RtConfig {
    let global_table = global_path.and_then(read_table);
    let local_table = read_table(local_path);

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            toml::Value::Table(global)
        }
        (Some(global), None) => toml::Value::Table(global),
        (None, Some(local)) => toml::Value::Table(local),
        (None, None) => return RtConfig::default(),
    };

    merged.try_into().unwrap_or_else(|e| {
        log::warn!("Ignoring invalid config: {}", e);
        RtConfig::default()
    })
}

fn read_table(path: &Path) -> Option<toml::Table> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Table>(&content) {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(
    base: &mut toml::map::Map<String, toml::Value>,
    overlay: toml::map::Map<String, toml::Value>,
) {
    for (key, value) in overlay {
        match (base.get_mut(&key), &value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table.clone());
            }
            _ => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RtConfig::default();
        assert_eq!(config.storage.namespace, "review-tree");
        assert_eq!(config.collapse.lock_patterns, vec!["*.lock*", "*-lock"]);
        assert_eq!(config.observe.quiet_window(), Duration::from_secs(15));
        assert_eq!(config.observe.poll_timeout(), Duration::from_secs(10));
        assert_eq!(config.bootstrap.poll_interval(), Duration::from_millis(30));
    }

    #[test]
    fn missing_files_give_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(
            Some(&dir.path().join("global.toml")),
            &dir.path().join("local.toml"),
        );
        assert_eq!(config.storage.namespace, "review-tree");
    }

    #[test]
    fn local_overrides_global_field_by_field() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let local = dir.path().join("local.toml");
        std::fs::write(
            &global,
            "[storage]\nnamespace = \"team\"\n[observe]\nquiet_window_ms = 1000\npoll_timeout_ms = 2000\n",
        )
        .unwrap();
        std::fs::write(&local, "[observe]\nquiet_window_ms = 500\n").unwrap();

        let config = load_config_from(Some(&global), &local);
        assert_eq!(config.storage.namespace, "team");
        assert_eq!(config.observe.quiet_window_ms, 500);
        assert_eq!(config.observe.poll_timeout_ms, 2000);
        assert_eq!(config.observe.poll_interval_ms, 30);
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.toml");
        std::fs::write(&local, "[observe]\nquiet_window_ms = \"soon\"\n").unwrap();
        let config = load_config_from(None, &local);
        assert_eq!(config.observe.quiet_window_ms, 15_000);
    }

    #[test]
    fn deep_merge_replaces_arrays() {
        let mut base: toml::map::Map<String, toml::Value> =
            toml::from_str("[collapse]\nlock_patterns = [\"*.lock*\"]\n").unwrap();
        let overlay: toml::map::Map<String, toml::Value> =
            toml::from_str("[collapse]\nlock_patterns = [\"*.snap\"]\n").unwrap();
        deep_merge(&mut base, overlay);
        let config: RtConfig = toml::Value::Table(base).try_into().unwrap();
        assert_eq!(config.collapse.lock_patterns, vec!["*.snap"]);
    }
}
