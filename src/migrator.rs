// `MigrationTrait` is an `#[async_trait]` trait, so its impls cannot name the
// `SchemaManager` lifetime without hitting E0195.
#![allow(elided_lifetimes_in_paths)]

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_locations_table::Migration),
            Box::new(m20240101_000002_create_stock_records_table::Migration),
            Box::new(m20240101_000003_create_status_definitions_table::Migration),
            Box::new(m20240101_000004_create_entity_statuses_table::Migration),
            Box::new(m20240101_000005_create_status_change_logs_table::Migration),
            Box::new(m20240101_000006_create_stock_transactions_table::Migration),
        ]
    }
}

mod m20240101_000001_create_locations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Locations::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Locations::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Locations::Code).string().not_null())
                        .col(ColumnDef::new(Locations::Lot).string().null())
                        .col(
                            ColumnDef::new(Locations::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Locations::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Locations::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_warehouse_id")
                        .table(Locations::Table)
                        .col(Locations::WarehouseId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Locations {
        Table,
        Id,
        WarehouseId,
        Code,
        Lot,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_records_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockRecords::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockRecords::LocationId).uuid().not_null())
                        .col(ColumnDef::new(StockRecords::Lot).string().null())
                        .col(ColumnDef::new(StockRecords::Cart).string().null())
                        .col(ColumnDef::new(StockRecords::Level).integer().null())
                        .col(
                            ColumnDef::new(StockRecords::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_records_product_id")
                        .table(StockRecords::Table)
                        .col(StockRecords::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_records_location_id")
                        .table(StockRecords::Table)
                        .col(StockRecords::LocationId)
                        .to_owned(),
                )
                .await?;

            // One record per stock slot; concurrent creators fall back to
            // incrementing the row that won.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_records_slot")
                        .table(StockRecords::Table)
                        .col(StockRecords::ProductId)
                        .col(StockRecords::LocationId)
                        .col(StockRecords::Lot)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockRecords {
        Table,
        Id,
        ProductId,
        LocationId,
        Lot,
        Cart,
        Level,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_status_definitions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_status_definitions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StatusDefinitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StatusDefinitions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StatusDefinitions::Name).string().not_null())
                        .col(
                            ColumnDef::new(StatusDefinitions::Effect)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusDefinitions::StatusType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusDefinitions::Color)
                                .string()
                                .not_null()
                                .default("#e0e0e0"),
                        )
                        .col(
                            ColumnDef::new(StatusDefinitions::TextColor)
                                .string()
                                .not_null()
                                .default("#000000"),
                        )
                        .col(ColumnDef::new(StatusDefinitions::Description).string().null())
                        .col(
                            ColumnDef::new(StatusDefinitions::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(StatusDefinitions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusDefinitions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StatusDefinitions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StatusDefinitions {
        Table,
        Id,
        Name,
        Effect,
        StatusType,
        Color,
        TextColor,
        Description,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_entity_statuses_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_entity_statuses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(EntityStatuses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EntityStatuses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EntityStatuses::EntityType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EntityStatuses::EntityId).string().not_null())
                        .col(ColumnDef::new(EntityStatuses::StatusId).uuid().not_null())
                        .col(
                            ColumnDef::new(EntityStatuses::AffectedQuantity)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(EntityStatuses::TotalQuantityAtApplication)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(EntityStatuses::Reason).string().null())
                        .col(ColumnDef::new(EntityStatuses::AppliedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(EntityStatuses::AppliedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One current status per entity; history lives in the change log.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_entity_statuses_entity")
                        .table(EntityStatuses::Table)
                        .col(EntityStatuses::EntityType)
                        .col(EntityStatuses::EntityId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(EntityStatuses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum EntityStatuses {
        Table,
        Id,
        EntityType,
        EntityId,
        StatusId,
        AffectedQuantity,
        TotalQuantityAtApplication,
        Reason,
        AppliedBy,
        AppliedAt,
    }
}

mod m20240101_000005_create_status_change_logs_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_status_change_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StatusChangeLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StatusChangeLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusChangeLogs::EntityType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusChangeLogs::EntityId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StatusChangeLogs::FromStatusId).uuid().null())
                        .col(ColumnDef::new(StatusChangeLogs::ToStatusId).uuid().null())
                        .col(
                            ColumnDef::new(StatusChangeLogs::AffectedQuantity)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(StatusChangeLogs::Reason).string().null())
                        .col(
                            ColumnDef::new(StatusChangeLogs::ChangedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusChangeLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_status_change_logs_entity")
                        .table(StatusChangeLogs::Table)
                        .col(StatusChangeLogs::EntityType)
                        .col(StatusChangeLogs::EntityId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StatusChangeLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StatusChangeLogs {
        Table,
        Id,
        EntityType,
        EntityId,
        FromStatusId,
        ToStatusId,
        AffectedQuantity,
        Reason,
        ChangedBy,
        CreatedAt,
    }
}

mod m20240101_000006_create_stock_transactions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_stock_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::StockRecordId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::FromLocationId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransactions::ToLocationId).uuid().null())
                        .col(ColumnDef::new(StockTransactions::Note).string().null())
                        .col(
                            ColumnDef::new(StockTransactions::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transactions_stock_record_id")
                        .table(StockTransactions::Table)
                        .col(StockTransactions::StockRecordId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockTransactions {
        Table,
        Id,
        StockRecordId,
        ProductId,
        TransactionType,
        Quantity,
        FromLocationId,
        ToLocationId,
        Note,
        CreatedBy,
        CreatedAt,
    }
}
