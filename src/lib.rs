pub mod coin;
pub mod config;
pub mod engine;
pub mod pool;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod snapshot;
pub mod spawner;
pub mod systems;

pub use config::{ConfigError, ConfigLoader, GameConfig};
pub use engine::{Engine, EngineBuilder, EngineSettings, FrameSummary};
pub use pool::{Handle, Pool, PoolError, Poolable};
pub use session::{Session, SessionBuilder, SessionSnapshot, SessionState};
