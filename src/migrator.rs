use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_users_table::Migration),
            Box::new(m20240601_000002_create_taxonomy_tables::Migration),
            Box::new(m20240601_000003_create_products_table::Migration),
            Box::new(m20240601_000004_create_reviews_table::Migration),
            Box::new(m20240601_000005_create_wishlist_table::Migration),
            Box::new(m20240601_000006_create_cart_tables::Migration),
            Box::new(m20240601_000007_create_receipt_tables::Migration),
        ]
    }
}

mod m20240601_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::FirstName).string().not_null())
                        .col(ColumnDef::new(Users::LastName).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::Phone).string().not_null())
                        .col(ColumnDef::new(Users::Address).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Image).string().null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(20)
                                .not_null()
                                .default("customer"),
                        )
                        .col(
                            ColumnDef::new(Users::IsVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::VerificationToken).string().null())
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_users_email_unique")
                        .table(Users::Table)
                        .col(Users::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Users {
        Table,
        Id,
        FirstName,
        LastName,
        Email,
        Phone,
        Address,
        PasswordHash,
        Image,
        Role,
        IsVerified,
        VerificationToken,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_taxonomy_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_taxonomy_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Image).string().null())
                        .col(ColumnDef::new(Categories::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Categories::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_categories_name_unique")
                        .table(Categories::Table)
                        .col(Categories::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Subcategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Subcategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Subcategories::Name).string().not_null())
                        .col(ColumnDef::new(Subcategories::CategoryId).uuid().not_null())
                        .col(
                            ColumnDef::new(Subcategories::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_subcategories_name_category_unique")
                        .table(Subcategories::Table)
                        .col(Subcategories::Name)
                        .col(Subcategories::CategoryId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Tags::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tags::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tags::Name).string().not_null())
                        .col(ColumnDef::new(Tags::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_tags_name_unique")
                        .table(Tags::Table)
                        .col(Tags::Name)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tags::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Subcategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Categories {
        Table,
        Id,
        Name,
        Image,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Subcategories {
        Table,
        Id,
        Name,
        CategoryId,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Tags {
        Table,
        Id,
        Name,
        CreatedAt,
    }
}

mod m20240601_000003_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Currency).string().not_null())
                        .col(ColumnDef::new(Products::Image).string().null())
                        .col(ColumnDef::new(Products::Sizes).json().null())
                        .col(ColumnDef::new(Products::Colors).json().null())
                        .col(ColumnDef::new(Products::DefaultSize).string().null())
                        .col(ColumnDef::new(Products::DefaultColor).string().null())
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::CategoryId).uuid().not_null())
                        .col(ColumnDef::new(Products::Subcategory).string().null())
                        .col(ColumnDef::new(Products::Tags).json().null())
                        .col(
                            ColumnDef::new(Products::BestSelling)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Products::NewArrival)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Products::Rating).decimal_len(3, 2).null())
                        .col(ColumnDef::new(Products::Discount).decimal_len(5, 2).null())
                        .col(ColumnDef::new(Products::OldPrice).decimal_len(19, 4).null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_name_category_unique")
                        .table(Products::Table)
                        .col(Products::Name)
                        .col(Products::CategoryId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Products {
        Table,
        Id,
        Name,
        Description,
        Price,
        Currency,
        Image,
        Sizes,
        Colors,
        DefaultSize,
        DefaultColor,
        Quantity,
        CategoryId,
        Subcategory,
        Tags,
        BestSelling,
        NewArrival,
        Rating,
        Discount,
        OldPrice,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_reviews_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_reviews_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Reviews::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Reviews::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::UserId).uuid().not_null())
                        .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                        .col(ColumnDef::new(Reviews::Comment).text().not_null())
                        .col(ColumnDef::new(Reviews::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_reviews_product")
                        .table(Reviews::Table)
                        .col(Reviews::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Reviews {
        Table,
        Id,
        ProductId,
        UserId,
        Rating,
        Comment,
        CreatedAt,
    }
}

mod m20240601_000005_create_wishlist_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_wishlist_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WishlistItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WishlistItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WishlistItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(WishlistItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(WishlistItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_wishlist_user_product_unique")
                        .table(WishlistItems::Table)
                        .col(WishlistItems::UserId)
                        .col(WishlistItems::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WishlistItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum WishlistItems {
        Table,
        Id,
        UserId,
        ProductId,
        CreatedAt,
    }
}

mod m20240601_000006_create_cart_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000006_create_cart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Carts::UserId).uuid().not_null())
                        .col(ColumnDef::new(Carts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Carts::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            // One cart per user; concurrent create-or-fetch races resolve here
            manager
                .create_index(
                    Index::create()
                        .name("idx_carts_user_unique")
                        .table(Carts::Table)
                        .col(Carts::UserId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(CartItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(CartItems::SelectedSize).string().null())
                        .col(ColumnDef::new(CartItems::SelectedColor).string().null())
                        .col(ColumnDef::new(CartItems::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(CartItems::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            // At most one line per product per cart
            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_cart_product_unique")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .col(CartItems::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Carts {
        Table,
        Id,
        UserId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        ProductId,
        Quantity,
        SelectedSize,
        SelectedColor,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000007_create_receipt_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000007_create_receipt_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Receipts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Receipts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Receipts::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Receipts::UserId).uuid().not_null())
                        .col(ColumnDef::new(Receipts::CustomerName).string().not_null())
                        .col(ColumnDef::new(Receipts::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Receipts::CustomerPhone).string().not_null())
                        .col(
                            ColumnDef::new(Receipts::Amount)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Receipts::TransactionId).string().not_null())
                        .col(ColumnDef::new(Receipts::Status).string().not_null())
                        .col(ColumnDef::new(Receipts::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            // At most one receipt per order: concurrent duplicate verification
            // calls race on this index, not on the application-level check
            manager
                .create_index(
                    Index::create()
                        .name("idx_receipts_order_unique")
                        .table(Receipts::Table)
                        .col(Receipts::OrderId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_receipts_user")
                        .table(Receipts::Table)
                        .col(Receipts::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReceiptItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceiptItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceiptItems::ReceiptId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(ReceiptItems::Price)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceiptItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(ReceiptItems::Total)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceiptItems::Image).string().null())
                        .col(
                            ColumnDef::new(ReceiptItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_receipt_items_receipt")
                        .table(ReceiptItems::Table)
                        .col(ReceiptItems::ReceiptId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReceiptItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Receipts::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Receipts {
        Table,
        Id,
        OrderId,
        UserId,
        CustomerName,
        CustomerEmail,
        CustomerPhone,
        Amount,
        TransactionId,
        Status,
        CreatedAt,
    }

    #[derive(Iden)]
    enum ReceiptItems {
        Table,
        Id,
        ReceiptId,
        ProductId,
        Name,
        Price,
        Quantity,
        Total,
        Image,
        CreatedAt,
    }
}
