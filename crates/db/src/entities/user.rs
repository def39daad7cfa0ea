//! User entity mirroring identities from the external provider.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub username: String,

    /// Display email, shown in the creator-facing attribution view.
    #[sea_orm(unique)]
    pub email: String,

    /// Bearer credential issued at registration.
    #[sea_orm(unique)]
    pub token: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vote_record::Entity")]
    VoteRecord,

    #[sea_orm(has_one = "super::score::Entity")]
    Score,
}

impl Related<super::vote_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoteRecord.def()
    }
}

impl Related<super::score::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Score.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
