//! Business logic services.

pub mod event_publisher;
pub mod notification;
pub mod poll;
pub mod tally;
pub mod user;

pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use notification::NotificationService;
pub use poll::{CreatePollInput, PollService, PollView};
pub use tally::{AnswerKey, TallyEntry, VoteMap, Voter};
pub use user::{RegisterInput, SessionContext, UserService};
