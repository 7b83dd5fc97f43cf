//! Coin spawner: picks a spot and a variant, then takes a coin from the pool.

use std::time::Duration;

use log::debug;
use rand::Rng;

use crate::{
    coin::{Coin, Placement, Position},
    config::ConfigError,
    pool::{Acquired, Handle, Pool, PoolError},
};

pub type CoinPool = Pool<Coin>;

/// Rendering side of placement: how big the play area currently is.
pub trait Viewport {
    fn size(&self) -> (f32, f32);
}

/// Headless viewport with a fixed size.
#[derive(Debug, Clone, Copy)]
pub struct FixedViewport {
    pub width: f32,
    pub height: f32,
}

impl FixedViewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for FixedViewport {
    fn default() -> Self {
        Self::new(1080.0, 1920.0)
    }
}

impl Viewport for FixedViewport {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRegion {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Default for SpawnRegion {
    fn default() -> Self {
        Self {
            left: 0.1,
            right: 0.9,
            bottom: 0.2,
            top: 0.8,
        }
    }
}

impl SpawnRegion {
    /// Absolute bounds `(x_min, x_max, y_min, y_max)` with the origin at the
    /// viewport centre.
    pub fn bounds(&self, width: f32, height: f32) -> (f32, f32, f32, f32) {
        (
            width * self.left - width / 2.0,
            width * self.right - width / 2.0,
            height * self.bottom - height / 2.0,
            height * self.top - height / 2.0,
        )
    }

    pub fn sample(&self, width: f32, height: f32, rng: &mut impl Rng) -> Position {
        let (x_min, x_max, y_min, y_max) = self.bounds(width, height);
        Position {
            x: uniform(rng, x_min, x_max),
            y: uniform(rng, y_min, y_max),
        }
    }
}

fn uniform(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoinVariant {
    pub name: String,
    pub value: i64,
    pub color: String,
    pub weight: f64,
}

/// Variants with weights normalized to sum to one.
#[derive(Debug, Clone, Default)]
pub struct VariantTable {
    variants: Vec<CoinVariant>,
    total_weight: f64,
}

impl VariantTable {
    pub fn new(variants: Vec<CoinVariant>) -> Result<Self, ConfigError> {
        let mut total_weight = 0.0;
        for variant in &variants {
            if !variant.weight.is_finite() || variant.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: variant.name.clone(),
                    weight: variant.weight,
                });
            }
            total_weight += variant.weight;
        }
        if !variants.is_empty() && total_weight <= 0.0 {
            return Err(ConfigError::ZeroWeightSum);
        }
        Ok(Self {
            variants,
            total_weight,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variants(&self) -> &[CoinVariant] {
        &self.variants
    }

    /// Walk the variants in order, accumulating normalized weight, and stop at
    /// the first whose running sum passes `draw` (a uniform sample in `[0, 1)`).
    pub fn pick(&self, draw: f64) -> Option<&CoinVariant> {
        let mut cumulative = 0.0;
        for variant in &self.variants {
            cumulative += variant.weight / self.total_weight;
            if draw < cumulative {
                return Some(variant);
            }
        }
        // rounding can leave the sum a hair under 1.0
        self.variants.iter().rev().find(|v| v.weight > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonusRule {
    pub chance: f64,
    pub multiplier: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOutcome {
    pub acquired: Acquired,
    pub placement: Placement,
}

pub struct CoinSpawner {
    pool: CoinPool,
    region: SpawnRegion,
    variants: VariantTable,
    bonus: Option<BonusRule>,
    base_value: i64,
    viewport: Box<dyn Viewport>,
}

impl CoinSpawner {
    pub fn new(
        pool: CoinPool,
        region: SpawnRegion,
        variants: VariantTable,
        viewport: Box<dyn Viewport>,
    ) -> Self {
        Self {
            pool,
            region,
            variants,
            bonus: None,
            base_value: 1,
            viewport,
        }
    }

    pub fn with_bonus(mut self, bonus: Option<BonusRule>) -> Self {
        self.bonus = bonus;
        self
    }

    /// Value used when no variants are configured
    pub fn with_base_value(mut self, value: i64) -> Self {
        self.base_value = value;
        self
    }

    pub fn placement(&self, rng: &mut impl Rng) -> Placement {
        let (width, height) = self.viewport.size();
        let position = self.region.sample(width, height, rng);
        let (mut value, variant) = match self.variants.pick(rng.gen::<f64>()) {
            Some(v) => (v.value, Some(v.name.clone())),
            None => (self.base_value, None),
        };
        let bonus = match self.bonus {
            Some(rule) if rng.gen::<f64>() < rule.chance => {
                value = value.saturating_mul(rule.multiplier);
                true
            }
            _ => false,
        };
        Placement {
            position,
            value,
            variant,
            bonus,
        }
    }

    /// Take a coin from the pool and start its entrance at `now`.
    pub fn spawn(&mut self, now: Duration, rng: &mut impl Rng) -> Result<SpawnOutcome, PoolError> {
        let placement = self.placement(rng);
        let acquired = self.pool.acquire()?;
        if let Some(coin) = self.pool.get_mut(acquired.handle) {
            coin.activate(placement.clone(), now);
        }
        debug!(
            "spawned {} coin worth {} at ({:.1}, {:.1})",
            placement.variant.as_deref().unwrap_or("plain"),
            placement.value,
            placement.position.x,
            placement.position.y
        );
        Ok(SpawnOutcome {
            acquired,
            placement,
        })
    }

    pub fn clear_all(&mut self) -> Vec<Handle> {
        self.pool.release_all()
    }

    pub fn pool(&self) -> &CoinPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut CoinPool {
        &mut self.pool
    }
}
