mod countdown;
mod machine;
mod settings;
mod ticker;

pub use countdown::Countdown;
pub use machine::{FocusMachine, FocusState, Phase};
pub use settings::{SettingsPatch, TimerSettings};
pub use ticker::{TickHandle, TickScope};
