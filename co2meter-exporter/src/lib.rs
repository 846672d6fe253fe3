pub mod config;
pub mod device;
pub mod metrics;
pub mod poll;
pub mod reporter;
pub mod state;

pub use config::{Cli, Config, ConfigError};
pub use device::{Device, DeviceError};
pub use poll::{InvalidFramePolicy, PollConfig, PollError, PollExit, PollLoop};
pub use reporter::run_reporter;
pub use state::{EnvironmentSnapshot, EnvironmentState};
