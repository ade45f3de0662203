//! Artisan configuration (TOML).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::gate::GatePolicy;

/// Top-level configuration.
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields and sections default to sensible values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtisanConfig {
    pub quality: QualityConfig,
    pub resume: ResumeConfig,
    pub prompt: PromptConfig,
    pub capture: CaptureConfig,
    pub backend: BackendConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QualityConfig {
    /// Steps with index below this count use the stricter threshold.
    pub critical_step_count: usize,
    pub critical_threshold: u8,
    pub default_threshold: u8,
    pub max_refinements_per_step: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            critical_step_count: 5,
            critical_threshold: 7,
            default_threshold: 6,
            max_refinements_per_step: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResumeConfig {
    /// Resume detection runs only when the scene holds strictly more
    /// objects than this.
    pub min_objects: usize,
    /// At most this fraction of the plan may be marked already complete.
    pub cap_fraction: f64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            min_objects: 3,
            cap_fraction: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    /// Truncate the requirement text beyond this many characters.
    pub requirement_max_chars: usize,
    /// How many recent tool results to include in execution prompts.
    pub history_window: usize,
    /// How many objects the resume detector inspects in detail.
    pub inspect_object_limit: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            requirement_max_chars: 4000,
            history_window: 2,
            inspect_object_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Longest screenshot edge requested from the backend, in pixels.
    pub snapshot_max_size: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snapshot_max_size: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9876,
            timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used for planning, step execution, resume detection, refinement.
    pub reasoning: String,
    /// Model used for screenshot critiques.
    pub vision: String,
    pub max_tokens: u32,
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            reasoning: "claude-sonnet-4-5".to_string(),
            vision: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }
}

impl ArtisanConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("quality.critical_threshold", self.quality.critical_threshold),
            ("quality.default_threshold", self.quality.default_threshold),
        ] {
            if !(1..=10).contains(&value) {
                return Err(anyhow!("{name} must be between 1 and 10"));
            }
        }
        if !(0.0..=1.0).contains(&self.resume.cap_fraction) {
            return Err(anyhow!("resume.cap_fraction must be between 0.0 and 1.0"));
        }
        if self.prompt.requirement_max_chars == 0 {
            return Err(anyhow!("prompt.requirement_max_chars must be > 0"));
        }
        if self.capture.snapshot_max_size == 0 {
            return Err(anyhow!("capture.snapshot_max_size must be > 0"));
        }
        if self.backend.host.trim().is_empty() {
            return Err(anyhow!("backend.host must be non-empty"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(anyhow!("backend.timeout_secs must be > 0"));
        }
        if self.model.reasoning.trim().is_empty() || self.model.vision.trim().is_empty() {
            return Err(anyhow!("model.reasoning and model.vision must be non-empty"));
        }
        if self.model.max_tokens == 0 {
            return Err(anyhow!("model.max_tokens must be > 0"));
        }
        Ok(())
    }

    /// The quality-gate thresholds this config implies.
    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            critical_step_count: self.quality.critical_step_count,
            critical_threshold: self.quality.critical_threshold,
            default_threshold: self.quality.default_threshold,
            max_refinements_per_step: self.quality.max_refinements_per_step,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ArtisanConfig::default()`.
pub fn load_config(path: &Path) -> Result<ArtisanConfig> {
    if !path.exists() {
        let cfg = ArtisanConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ArtisanConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ArtisanConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ArtisanConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = ArtisanConfig::default();
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_missing_sections_with_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[quality]\ncritical_threshold = 9\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.quality.critical_threshold, 9);
        assert_eq!(cfg.quality.default_threshold, 6);
        assert_eq!(cfg.backend.port, 9876);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let cfg = ArtisanConfig {
            quality: QualityConfig {
                critical_threshold: 11,
                ..QualityConfig::default()
            },
            ..ArtisanConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("critical_threshold"));
    }

    #[test]
    fn rejects_cap_fraction_above_one() {
        let cfg = ArtisanConfig {
            resume: ResumeConfig {
                cap_fraction: 1.5,
                ..ResumeConfig::default()
            },
            ..ArtisanConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn gate_policy_mirrors_quality_section() {
        let cfg = ArtisanConfig::default();
        let policy = cfg.gate_policy();
        assert_eq!(policy.critical_threshold, 7);
        assert_eq!(policy.default_threshold, 6);
        assert_eq!(policy.max_refinements_per_step, 2);
    }
}
