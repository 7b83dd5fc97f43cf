//! Game configuration loaded from YAML.
//!
//! Every field has a documented default. Values that are present but unusable
//! (non-positive durations, inverted spawn bounds, ...) fall back to that default
//! with a warning. Only problems that make a session impossible to build are
//! reported as [`ConfigError`].

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    coin::CoinTimings,
    session::{combo::ComboRule, DifficultyRamp, SessionSettings},
    spawner::{BonusRule, CoinVariant, SpawnRegion, VariantTable},
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("pool max_size must be at least 1 (got {0})")]
    PoolCapacity(usize),
    #[error("variant '{name}' has invalid weight {weight}")]
    InvalidWeight { name: String, weight: f64 },
    #[error("variant weights must not all be zero")]
    ZeroWeightSum,
}

fn default_seed() -> u64 {
    7
}

fn default_duration_secs() -> f64 {
    30.0
}

fn default_spawn_interval_secs() -> f64 {
    1.5
}

fn default_spawn_start_delay_secs() -> f64 {
    1.0
}

fn default_timer_tick_secs() -> f64 {
    0.1
}

fn default_points_per_coin() -> i64 {
    1
}

fn default_initial_pool_size() -> usize {
    10
}

fn default_max_pool_size() -> usize {
    20
}

fn default_lifetime_secs() -> f64 {
    3.0
}

fn default_spawn_animation_secs() -> f64 {
    0.3
}

fn default_collect_animation_secs() -> f64 {
    0.2
}

fn default_fade_secs() -> f64 {
    0.5
}

fn default_left() -> f32 {
    0.1
}

fn default_right() -> f32 {
    0.9
}

fn default_bottom() -> f32 {
    0.2
}

fn default_top() -> f32 {
    0.8
}

fn default_bonus_chance() -> f64 {
    0.05
}

fn default_bonus_multiplier() -> i64 {
    10
}

fn default_min_spawn_interval_secs() -> f64 {
    0.8
}

fn default_ramp_secs() -> f64 {
    15.0
}

fn default_max_combo_multiplier() -> f64 {
    2.0
}

fn default_coins_for_max_combo() -> u32 {
    5
}

fn default_combo_window_secs() -> f64 {
    2.0
}

fn default_variants() -> Vec<VariantConfig> {
    vec![
        VariantConfig {
            name: "Bronze".into(),
            value: 1,
            color: "#cc8033".into(),
            weight: 60.0,
        },
        VariantConfig {
            name: "Silver".into(),
            value: 2,
            color: "#bfbfbf".into(),
            weight: 30.0,
        },
        VariantConfig {
            name: "Gold".into(),
            value: 5,
            color: "#ffd600".into(),
            weight: 10.0,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub coin: CoinConfig,
    #[serde(default)]
    pub spawn_region: RegionConfig,
    #[serde(default = "default_variants")]
    pub variants: Vec<VariantConfig>,
    #[serde(default)]
    pub bonus: BonusConfig,
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    #[serde(default)]
    pub combo: ComboConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,
    #[serde(default = "default_spawn_interval_secs")]
    pub spawn_interval_secs: f64,
    #[serde(default = "default_spawn_start_delay_secs")]
    pub spawn_start_delay_secs: f64,
    #[serde(default = "default_timer_tick_secs")]
    pub timer_tick_secs: f64,
    #[serde(default = "default_points_per_coin")]
    pub points_per_coin: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_initial_pool_size")]
    pub initial_size: usize,
    #[serde(default = "default_max_pool_size")]
    pub max_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinConfig {
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: f64,
    #[serde(default = "default_spawn_animation_secs")]
    pub spawn_animation_secs: f64,
    #[serde(default = "default_collect_animation_secs")]
    pub collect_animation_secs: f64,
    #[serde(default = "default_fade_secs")]
    pub fade_secs: f64,
}

/// Spawn bounds as fractions of the viewport. `left`/`right` are measured from
/// the left edge, `bottom`/`top` from the bottom edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    #[serde(default = "default_left")]
    pub left: f32,
    #[serde(default = "default_right")]
    pub right: f32,
    #[serde(default = "default_bottom")]
    pub bottom: f32,
    #[serde(default = "default_top")]
    pub top: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    pub value: i64,
    #[serde(default)]
    pub color: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bonus_chance")]
    pub chance: f64,
    #[serde(default = "default_bonus_multiplier")]
    pub multiplier: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_min_spawn_interval_secs")]
    pub min_spawn_interval_secs: f64,
    #[serde(default = "default_ramp_secs")]
    pub ramp_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_combo_multiplier")]
    pub max_multiplier: f64,
    #[serde(default = "default_coins_for_max_combo")]
    pub coins_for_max: u32,
    #[serde(default = "default_combo_window_secs")]
    pub window_secs: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            session: SessionConfig::default(),
            pool: PoolConfig::default(),
            coin: CoinConfig::default(),
            spawn_region: RegionConfig::default(),
            variants: default_variants(),
            bonus: BonusConfig::default(),
            difficulty: DifficultyConfig::default(),
            combo: ComboConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            spawn_interval_secs: default_spawn_interval_secs(),
            spawn_start_delay_secs: default_spawn_start_delay_secs(),
            timer_tick_secs: default_timer_tick_secs(),
            points_per_coin: default_points_per_coin(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_pool_size(),
            max_size: default_max_pool_size(),
        }
    }
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: default_lifetime_secs(),
            spawn_animation_secs: default_spawn_animation_secs(),
            collect_animation_secs: default_collect_animation_secs(),
            fade_secs: default_fade_secs(),
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            left: default_left(),
            right: default_right(),
            bottom: default_bottom(),
            top: default_top(),
        }
    }
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chance: default_bonus_chance(),
            multiplier: default_bonus_multiplier(),
        }
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_spawn_interval_secs: default_min_spawn_interval_secs(),
            ramp_secs: default_ramp_secs(),
        }
    }
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_multiplier: default_max_combo_multiplier(),
            coins_for_max: default_coins_for_max_combo(),
            window_secs: default_combo_window_secs(),
        }
    }
}

/// Converts seconds to a `Duration` through whole milliseconds so repeated
/// ticks sum without drift.
pub fn secs_to_duration(secs: f64) -> Duration {
    Duration::from_millis((secs * 1_000.0).round() as u64)
}

fn positive_secs(field: &str, value: f64, default: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        let duration = secs_to_duration(value);
        if !duration.is_zero() {
            return duration;
        }
    }
    warn!("config: {field} = {value} is not a positive duration, using default {default}s");
    secs_to_duration(default)
}

fn non_negative_secs(field: &str, value: f64, default: f64) -> Duration {
    if value.is_finite() && value >= 0.0 {
        return secs_to_duration(value);
    }
    warn!("config: {field} = {value} is negative or not finite, using default {default}s");
    secs_to_duration(default)
}

impl GameConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: GameConfig =
            serde_yaml::from_str(text).context("Failed to parse game config")?;
        Ok(config)
    }

    /// Checks the problems that cannot be defaulted away.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.max_size < 1 {
            return Err(ConfigError::PoolCapacity(self.pool.max_size));
        }
        self.variant_table().map(|_| ())
    }

    pub fn session_settings(&self) -> SessionSettings {
        let session = &self.session;
        let spawn_interval = positive_secs(
            "session.spawn_interval_secs",
            session.spawn_interval_secs,
            default_spawn_interval_secs(),
        );
        let points_per_coin = if session.points_per_coin >= 1 {
            session.points_per_coin
        } else {
            warn!(
                "config: session.points_per_coin = {} is below 1, using default {}",
                session.points_per_coin,
                default_points_per_coin()
            );
            default_points_per_coin()
        };

        let difficulty = self.difficulty.enabled.then(|| {
            let min_interval = positive_secs(
                "difficulty.min_spawn_interval_secs",
                self.difficulty.min_spawn_interval_secs,
                default_min_spawn_interval_secs(),
            );
            DifficultyRamp {
                min_interval: min_interval.min(spawn_interval),
                ramp: positive_secs(
                    "difficulty.ramp_secs",
                    self.difficulty.ramp_secs,
                    default_ramp_secs(),
                ),
            }
        });

        let combo = self.combo.enabled.then(|| {
            let max_multiplier =
                if self.combo.max_multiplier.is_finite() && self.combo.max_multiplier >= 1.0 {
                    self.combo.max_multiplier
                } else {
                    warn!(
                        "config: combo.max_multiplier = {} is invalid, using default {}",
                        self.combo.max_multiplier,
                        default_max_combo_multiplier()
                    );
                    default_max_combo_multiplier()
                };
            ComboRule {
                max_multiplier,
                coins_for_max: self.combo.coins_for_max.max(1),
                window: positive_secs(
                    "combo.window_secs",
                    self.combo.window_secs,
                    default_combo_window_secs(),
                ),
            }
        });

        SessionSettings {
            duration: positive_secs(
                "session.duration_secs",
                session.duration_secs,
                default_duration_secs(),
            ),
            spawn_interval,
            spawn_start_delay: non_negative_secs(
                "session.spawn_start_delay_secs",
                session.spawn_start_delay_secs,
                default_spawn_start_delay_secs(),
            ),
            timer_tick: positive_secs(
                "session.timer_tick_secs",
                session.timer_tick_secs,
                default_timer_tick_secs(),
            ),
            points_per_coin,
            difficulty,
            combo,
        }
    }

    pub fn coin_timings(&self) -> CoinTimings {
        let coin = &self.coin;
        CoinTimings {
            spawn: positive_secs(
                "coin.spawn_animation_secs",
                coin.spawn_animation_secs,
                default_spawn_animation_secs(),
            ),
            lifetime: positive_secs("coin.lifetime_secs", coin.lifetime_secs, default_lifetime_secs()),
            collect: positive_secs(
                "coin.collect_animation_secs",
                coin.collect_animation_secs,
                default_collect_animation_secs(),
            ),
            fade: positive_secs("coin.fade_secs", coin.fade_secs, default_fade_secs()),
        }
    }

    pub fn spawn_region(&self) -> SpawnRegion {
        let r = &self.spawn_region;
        let in_unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if in_unit(r.left) && in_unit(r.right) && in_unit(r.bottom) && in_unit(r.top)
            && r.left < r.right
            && r.bottom < r.top
        {
            SpawnRegion {
                left: r.left,
                right: r.right,
                bottom: r.bottom,
                top: r.top,
            }
        } else {
            warn!("config: spawn_region {r:?} is invalid, using default bounds");
            SpawnRegion::default()
        }
    }

    pub fn variant_table(&self) -> Result<VariantTable, ConfigError> {
        let variants = self
            .variants
            .iter()
            .map(|v| CoinVariant {
                name: v.name.clone(),
                value: v.value,
                color: v.color.clone(),
                weight: v.weight,
            })
            .collect();
        VariantTable::new(variants)
    }

    pub fn bonus_rule(&self) -> Option<BonusRule> {
        if !self.bonus.enabled {
            return None;
        }
        let chance = if self.bonus.chance.is_finite() && (0.0..=1.0).contains(&self.bonus.chance)
        {
            self.bonus.chance
        } else {
            warn!(
                "config: bonus.chance = {} is outside [0, 1], using default {}",
                self.bonus.chance,
                default_bonus_chance()
            );
            default_bonus_chance()
        };
        let multiplier = if self.bonus.multiplier >= 1 {
            self.bonus.multiplier
        } else {
            warn!(
                "config: bonus.multiplier = {} is below 1, using default {}",
                self.bonus.multiplier,
                default_bonus_multiplier()
            );
            default_bonus_multiplier()
        };
        Some(BonusRule { chance, multiplier })
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<GameConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: GameConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}
