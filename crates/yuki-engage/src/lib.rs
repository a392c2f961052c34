//! # yuki-engage
//!
//! Decides when Yuki should speak up in a group on its own.
//!
//! - `activity`: per-chat message/user windows and the "is this chat quiet?" policy
//! - `scheduler`: the background loop that picks quiet chats and talks to them
//! - `composer`: turns an activity snapshot into a conversation opener via a provider
//! - `dispatch`: sends the opener and reports the bot's identity
//! - `clock`: wall-clock source, swappable in tests

pub mod activity;
pub mod clock;
pub mod composer;
pub mod dispatch;
pub mod scheduler;

pub use activity::{
    ActivityMonitor, ActivityStore, ChatActivity, ChatStats, InteractionContext, TimeOfDay,
};
pub use clock::{Clock, SystemClock};
pub use composer::MessageComposer;
pub use dispatch::{ChannelDispatcher, Dispatcher};
pub use scheduler::{
    CheckReport, CycleReport, CycleSummary, InteractionScheduler, QuietChat, SchedulerPhase,
    SchedulerStatus, SkipReason, DAILY_INTERACTION_CAP,
};
