//! Poll aggregate root.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub question: String,

    /// Option labels (JSON array of 2-4 strings); index is the option's
    /// stable identity.
    #[sea_orm(column_type = "Json")]
    pub options: JsonValue,

    /// Whether voters may select more than one option per submission.
    pub multiple_choice: bool,

    /// Answer key for single-choice polls.
    #[sea_orm(nullable)]
    pub correct_option: Option<i32>,

    /// Answer key for multiple-choice polls (JSON array of indices).
    #[sea_orm(column_type = "Json", nullable)]
    pub correct_options: Option<JsonValue>,

    /// Authoring user; grants delete rights and the attribution view.
    #[sea_orm(nullable)]
    pub creator_id: Option<String>,

    /// Tally map: stringified option index -> { count, users }.
    /// Absent key means zero votes for that option.
    #[sea_orm(column_type = "Json")]
    pub votes: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Creator,

    #[sea_orm(has_many = "super::vote_record::Entity")]
    VoteRecord,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::vote_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoteRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
