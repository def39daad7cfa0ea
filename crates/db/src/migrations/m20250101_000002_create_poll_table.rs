//! Create poll table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Poll::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Poll::Question).text().not_null())
                    .col(ColumnDef::new(Poll::Options).json_binary().not_null())
                    .col(
                        ColumnDef::new(Poll::MultipleChoice)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Poll::CorrectOption).integer())
                    .col(ColumnDef::new(Poll::CorrectOptions).json_binary())
                    .col(ColumnDef::new(Poll::CreatorId).string_len(32))
                    .col(
                        ColumnDef::new(Poll::Votes)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_creator")
                            .from(Poll::Table, Poll::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_creator_id")
                    .table(Poll::Table)
                    .col(Poll::CreatorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    Question,
    Options,
    MultipleChoice,
    CorrectOption,
    CorrectOptions,
    CreatorId,
    Votes,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
