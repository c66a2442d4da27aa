//! Bus configuration management

use anyhow::{Context, Result, anyhow};
use protocol::{PlugInRecord, SerialNo, TargetKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub bus: BusSettings,
    #[serde(default)]
    pub reclaim: ReclaimSettings,
    /// Targets plugged in by the host at startup
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSettings {
    pub log_level: String,
}

/// Reclamation of missing entries
///
/// # Example Configuration
/// ```toml
/// [reclaim]
/// interval = "30s"
/// eager = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimSettings {
    /// Period of the background reclaimer ("5s", "1m", "1h30m")
    #[serde(
        default = "ReclaimSettings::default_interval",
        with = "duration_serde"
    )]
    pub interval: Duration,
    /// Reclaim right after every unplug instead of waiting for the next tick
    #[serde(default)]
    pub eager: bool,
}

impl Default for ReclaimSettings {
    fn default() -> Self {
        Self {
            interval: Self::default_interval(),
            eager: false,
        }
    }
}

impl ReclaimSettings {
    fn default_interval() -> Duration {
        Duration::from_secs(5)
    }
}

/// Host-declared target
///
/// # Example Configuration
/// ```toml
/// [[targets]]
/// serial_no = 1
/// kind = "xbox360-wired"
///
/// [[targets]]
/// serial_no = 2
/// kind = "dualshock4-wired"
/// vendor_id = 0x054C
/// product_id = 0x09CC
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub serial_no: u32,
    pub kind: TargetKind,
    /// Vendor ID override (both IDs must be set to take effect)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<u16>,
}

impl TargetConfig {
    /// Plug-in record for this target
    pub fn to_record(&self) -> PlugInRecord {
        PlugInRecord::new(SerialNo(self.serial_no), self.kind).with_ids(
            self.vendor_id.unwrap_or_default(),
            self.product_id.unwrap_or_default(),
        )
    }
}

/// Custom serde module for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        format_duration(*duration).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Parse a duration string like "1h", "30m", "1h30m"
    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim().to_lowercase();
        let mut total_secs: u64 = 0;
        let mut current_num = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_num.push(c);
            } else {
                if current_num.is_empty() {
                    return Err(format!("Invalid duration format: {}", s));
                }
                let num: u64 = current_num
                    .parse()
                    .map_err(|_| format!("Invalid number in duration: {}", current_num))?;
                current_num.clear();

                let secs = match c {
                    'h' => num.checked_mul(3600),
                    'm' => num.checked_mul(60),
                    's' => Some(num),
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_secs = secs
                    .and_then(|secs| total_secs.checked_add(secs))
                    .ok_or_else(|| "duration overflow".to_string())?;
            }
        }

        // Trailing bare number counts as seconds
        if !current_num.is_empty() {
            let num: u64 = current_num
                .parse()
                .map_err(|_| format!("Invalid number in duration: {}", current_num))?;
            total_secs = total_secs
                .checked_add(num)
                .ok_or_else(|| "duration overflow".to_string())?;
        }

        if total_secs == 0 {
            return Err("Duration must be greater than 0".to_string());
        }

        Ok(Duration::from_secs(total_secs))
    }

    pub fn format_duration(d: Duration) -> String {
        let secs = d.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        let mut result = String::new();
        if hours > 0 {
            result.push_str(&format!("{}h", hours));
        }
        if mins > 0 {
            result.push_str(&format!("{}m", mins));
        }
        if secs > 0 || result.is_empty() {
            result.push_str(&format!("{}s", secs));
        }
        result
    }
}

pub use duration_serde::parse_duration;

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus: BusSettings {
                log_level: "info".to_string(),
            },
            reclaim: ReclaimSettings::default(),
            targets: Vec::new(),
        }
    }
}

impl BusConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/vpad-bus/bus.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: BusConfig = toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("vpad-bus").join("bus.toml")
        } else {
            PathBuf::from(".config/vpad-bus/bus.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.bus.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.bus.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.reclaim.interval.is_zero() {
            return Err(anyhow!("Reclaim interval must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.serial_no == 0 {
                return Err(anyhow!("Target serial_no 0 is reserved"));
            }
            if !seen.insert(target.serial_no) {
                return Err(anyhow!("Duplicate target serial_no {}", target.serial_no));
            }
        }

        Ok(())
    }
}

/// Load configuration from a path that may start with `~`
pub fn load_config(path: &str) -> Result<BusConfig> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
    BusConfig::load(Some(path_buf))
}
