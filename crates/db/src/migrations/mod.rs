//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20240201_000001_create_user_table;
mod m20240201_000002_create_catalog_tables;
mod m20240201_000003_create_comment_table;
mod m20240201_000004_create_rating_table;
mod m20240201_000005_create_notification_table;
mod m20240201_000006_create_activity_table;
mod m20240201_000007_create_discussion_tables;
mod m20240201_000008_create_saved_movie_and_history_tables;
mod m20240201_000009_create_feedback_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_user_table::Migration),
            Box::new(m20240201_000002_create_catalog_tables::Migration),
            Box::new(m20240201_000003_create_comment_table::Migration),
            Box::new(m20240201_000004_create_rating_table::Migration),
            Box::new(m20240201_000005_create_notification_table::Migration),
            Box::new(m20240201_000006_create_activity_table::Migration),
            Box::new(m20240201_000007_create_discussion_tables::Migration),
            Box::new(m20240201_000008_create_saved_movie_and_history_tables::Migration),
            Box::new(m20240201_000009_create_feedback_table::Migration),
        ]
    }
}
