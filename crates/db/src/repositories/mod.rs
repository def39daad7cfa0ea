//! Repository layer: typed database access per entity.

mod poll;
mod score;
mod user;
mod vote_record;

pub use poll::PollRepository;
pub use score::ScoreRepository;
pub use user::UserRepository;
pub use vote_record::VoteRecordRepository;
