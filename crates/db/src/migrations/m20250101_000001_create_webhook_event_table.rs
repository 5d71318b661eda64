//! Create webhook event table for outbound event delivery.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WebhookEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebhookEvent::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WebhookEvent::EventType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WebhookEvent::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WebhookEvent::TeamId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(WebhookEvent::SiteId).string_len(64).null())
                    .col(ColumnDef::new(WebhookEvent::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(WebhookEvent::Delivered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WebhookEvent::DeliveryAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WebhookEvent::LastDeliveryStatus)
                            .string_len(255)
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Operators look for undelivered events that have been attempted
        manager
            .create_index(
                Index::create()
                    .name("idx_webhook_event_delivery_state")
                    .table(WebhookEvent::Table)
                    .col(WebhookEvent::Delivered)
                    .col(WebhookEvent::DeliveryAttempts)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_webhook_event_team_id")
                    .table(WebhookEvent::Table)
                    .col(WebhookEvent::TeamId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebhookEvent::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum WebhookEvent {
    Table,
    Id,
    EventType,
    CreatedAt,
    TeamId,
    SiteId,
    Data,
    Delivered,
    DeliveryAttempts,
    LastDeliveryStatus,
}
