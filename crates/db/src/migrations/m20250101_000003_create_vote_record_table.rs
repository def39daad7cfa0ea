//! Create vote_record table migration.
//!
//! The unique index on (user_id, question_id) enforces the one-vote
//! rule at the store level.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VoteRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VoteRecord::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VoteRecord::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(VoteRecord::QuestionId).big_integer().not_null())
                    .col(
                        ColumnDef::new(VoteRecord::SelectedOptions)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VoteRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_record_user")
                            .from(VoteRecord::Table, VoteRecord::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_record_poll")
                            .from(VoteRecord::Table, VoteRecord::QuestionId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One vote per (user, poll) - the authoritative duplicate guard
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_record_user_question")
                    .table(VoteRecord::Table)
                    .col(VoteRecord::UserId)
                    .col(VoteRecord::QuestionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vote_record_question_id")
                    .table(VoteRecord::Table)
                    .col(VoteRecord::QuestionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VoteRecord::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum VoteRecord {
    Table,
    Id,
    UserId,
    QuestionId,
    SelectedOptions,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}
