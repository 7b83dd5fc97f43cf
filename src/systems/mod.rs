mod autotap;
mod pause_script;
mod tally;

pub use autotap::AutoTapSystem;
pub use pause_script::PauseScriptSystem;
pub use tally::{TallyReport, TallySystem};
