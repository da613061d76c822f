//! Create saved_movie and history tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_user_movie_table(manager, SavedMovie::Table, "saved_movie").await?;
        create_user_movie_table(manager, History::Table, "history").await?;

        // Index: created_at (stale history purge)
        manager
            .create_index(
                Index::create()
                    .name("idx_history_created_at")
                    .table(History::Table)
                    .col(Link::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(History::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SavedMovie::Table).to_owned())
            .await
    }
}

/// Both tables link a user to a movie, at most once per pair.
async fn create_user_movie_table<T>(
    manager: &SchemaManager<'_>,
    table: T,
    name: &str,
) -> Result<(), DbErr>
where
    T: Iden + Copy + 'static,
{
    manager
        .create_table(
            Table::create()
                .table(table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Link::Id)
                        .string_len(32)
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(Link::UserId).string_len(32).not_null())
                .col(ColumnDef::new(Link::MovieId).string_len(32).not_null())
                .col(
                    ColumnDef::new(Link::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp()),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{name}_user"))
                        .from(table, Link::UserId)
                        .to(User::Table, User::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{name}_movie"))
                        .from(table, Link::MovieId)
                        .to(Movie::Table, Movie::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name(format!("idx_{name}_user_movie"))
                .table(table)
                .col(Link::UserId)
                .col(Link::MovieId)
                .unique()
                .to_owned(),
        )
        .await
}

#[derive(Iden, Clone, Copy)]
enum SavedMovie {
    Table,
}

#[derive(Iden, Clone, Copy)]
enum History {
    Table,
}

#[derive(Iden)]
enum Link {
    Id,
    UserId,
    MovieId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Movie {
    Table,
    Id,
}
