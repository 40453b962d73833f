use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Outbox::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Outbox::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Outbox::AggregateId).string().not_null())
                    .col(ColumnDef::new(Outbox::AggregateType).string().not_null())
                    .col(ColumnDef::new(Outbox::EventType).string().not_null())
                    .col(ColumnDef::new(Outbox::Payload).json_binary().not_null())
                    .col(
                        ColumnDef::new(Outbox::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING")
                            .check(Expr::col(Outbox::Status).is_in([
                                "PENDING",
                                "PROCESSED",
                                "FAILED",
                            ])),
                    )
                    .col(
                        ColumnDef::new(Outbox::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Relay poll: WHERE status = 'PENDING' ORDER BY created_at LIMIT n.
        manager
            .create_index(
                Index::create()
                    .table(Outbox::Table)
                    .col(Outbox::Status)
                    .col(Outbox::CreatedAt)
                    .name("idx_outbox_status_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Outbox::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Outbox {
    Table,
    Id,
    AggregateId,
    AggregateType,
    EventType,
    Payload,
    Status,
    CreatedAt,
}
