pub mod config;
pub mod error;
pub mod input;
pub mod types;

pub use config::PilotConfig;
pub use error::{PilotError, Result};
pub use input::{Button, Command};
pub use types::{Capabilities, Direction, Hm, InstanceId, ItemId, MapId, Tick, TilePos};
