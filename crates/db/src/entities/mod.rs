//! SeaORM entity definitions.

pub mod poll;
pub mod score;
pub mod user;
pub mod vote_record;

pub use poll::Entity as Poll;
pub use score::Entity as Score;
pub use user::Entity as User;
pub use vote_record::Entity as VoteRecord;
