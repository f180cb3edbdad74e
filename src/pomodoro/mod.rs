pub mod clock;
pub mod engine;
pub mod error;
#[allow(clippy::module_inception)]
pub mod pomodoro;

pub use clock::{Clock, SystemClock, Timer};
pub use engine::{PhaseEngine, Subscriber};
pub use error::ConfigError;
pub use pomodoro::{Config, Phase, State};
