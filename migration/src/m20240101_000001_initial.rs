use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    UserId,
    Realname,
    Birthday,
    PhoneNo,
    Email,
    LevelNo,
    ReferralCode,
    ReferrerUserId,
    CentercoinBalance,
    ReceivePush,
    UsedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Phones {
    Table,
    PhoneId,
    PhoneNo,
    Code,
    UsedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Licenses {
    Table,
    LicenseId,
    UserId,
    Realname,
    Birthday,
    LicenseStr,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Methods {
    Table,
    MethodId,
    UserId,
    Provider,
    Identity,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    SessionId,
    UserId,
    Platform,
    MessagingToken,
    UsedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Points {
    Table,
    PointId,
    UserId,
    Point,
    PointType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Levels {
    Table,
    LevelNo,
    Name,
    RequiredPoint,
    CouponGroupId,
    CouponQuantity,
}

#[derive(DeriveIden)]
enum PassPrograms {
    Table,
    PassProgramId,
    Name,
    Description,
    IsSale,
    AllowRenew,
    Price,
    Validity,
    CouponGroupId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Passes {
    Table,
    PassId,
    UserId,
    PassProgramId,
    CouponGroupId,
    CouponId,
    AutoRenew,
    ExpiredAt,
    RequestedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    NotificationId,
    UserId,
    NotificationType,
    Title,
    Description,
    Url,
    Visible,
    ReadedAt,
    SendedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Secessions {
    Table,
    UserId,
    Reason,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("method_provider"))
                    .values(vec![Alias::new("kakao")])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("point_type"))
                    .values(vec![
                        Alias::new("ride"),
                        Alias::new("event"),
                        Alias::new("referral"),
                        Alias::new("correction"),
                    ])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("notification_type"))
                    .values(vec![Alias::new("info"), Alias::new("advertising")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::UserId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Realname).string_len(16).not_null())
                    .col(ColumnDef::new(Users::Birthday).date().not_null())
                    .col(ColumnDef::new(Users::PhoneNo).string_len(32).not_null())
                    .col(ColumnDef::new(Users::Email).string_len(255).null())
                    .col(
                        ColumnDef::new(Users::LevelNo)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Users::ReferralCode)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Users::ReferrerUserId).string_len(36).null())
                    .col(
                        ColumnDef::new(Users::CentercoinBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::ReceivePush)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::UsedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_users_phone_no")
                    .table(Users::Table)
                    .col(Users::PhoneNo)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_users_referral_code")
                    .table(Users::Table)
                    .col(Users::ReferralCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Phones::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Phones::PhoneId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Phones::PhoneNo).string_len(32).not_null())
                    .col(ColumnDef::new(Phones::Code).string_len(6).null())
                    .col(ColumnDef::new(Phones::UsedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Phones::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_phones_phone_no")
                    .table(Phones::Table)
                    .col(Phones::PhoneNo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Licenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Licenses::LicenseId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Licenses::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(Licenses::Realname).string_len(16).not_null())
                    .col(ColumnDef::new(Licenses::Birthday).date().not_null())
                    .col(ColumnDef::new(Licenses::LicenseStr).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Licenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_licenses_user_id")
                    .table(Licenses::Table)
                    .col(Licenses::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Methods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Methods::MethodId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Methods::UserId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Methods::Provider)
                            .custom(Alias::new("method_provider"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Methods::Identity).string_len(255).not_null())
                    .col(ColumnDef::new(Methods::Description).string_len(255).null())
                    .col(
                        ColumnDef::new(Methods::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_methods_provider_identity")
                    .table(Methods::Table)
                    .col(Methods::Provider)
                    .col(Methods::Identity)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_methods_user_provider")
                    .table(Methods::Table)
                    .col(Methods::UserId)
                    .col(Methods::Provider)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::SessionId)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(Sessions::Platform).string_len(255).null())
                    .col(ColumnDef::new(Sessions::MessagingToken).string_len(512).null())
                    .col(ColumnDef::new(Sessions::UsedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Sessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_user_id")
                    .table(Sessions::Table)
                    .col(Sessions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Points::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Points::PointId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Points::UserId).string_len(36).not_null())
                    .col(ColumnDef::new(Points::Point).big_integer().not_null())
                    .col(
                        ColumnDef::new(Points::PointType)
                            .custom(Alias::new("point_type"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Points::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_points_user_created")
                    .table(Points::Table)
                    .col(Points::UserId)
                    .col(Points::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Levels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Levels::LevelNo)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Levels::Name).string_len(32).not_null())
                    .col(ColumnDef::new(Levels::RequiredPoint).big_integer().not_null())
                    .col(ColumnDef::new(Levels::CouponGroupId).string_len(36).null())
                    .col(ColumnDef::new(Levels::CouponQuantity).integer().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PassPrograms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PassPrograms::PassProgramId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PassPrograms::Name).string_len(16).not_null())
                    .col(ColumnDef::new(PassPrograms::Description).text().null())
                    .col(
                        ColumnDef::new(PassPrograms::IsSale)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PassPrograms::AllowRenew)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PassPrograms::Price).big_integer().null())
                    .col(ColumnDef::new(PassPrograms::Validity).big_integer().null())
                    .col(ColumnDef::new(PassPrograms::CouponGroupId).string_len(36).null())
                    .col(
                        ColumnDef::new(PassPrograms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PassPrograms::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Passes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Passes::PassId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Passes::UserId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Passes::PassProgramId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Passes::CouponGroupId).string_len(36).null())
                    .col(ColumnDef::new(Passes::CouponId).string_len(36).null())
                    .col(
                        ColumnDef::new(Passes::AutoRenew)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Passes::ExpiredAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Passes::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Passes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Passes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_passes_user_id")
                    .table(Passes::Table)
                    .col(Passes::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_passes_expired_requested")
                    .table(Passes::Table)
                    .col(Passes::ExpiredAt)
                    .col(Passes::RequestedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::NotificationId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::UserId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(Notifications::NotificationType)
                            .custom(Alias::new("notification_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::Title).string_len(200).null())
                    .col(ColumnDef::new(Notifications::Description).string_len(1024).null())
                    .col(ColumnDef::new(Notifications::Url).string_len(512).null())
                    .col(
                        ColumnDef::new(Notifications::Visible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Notifications::ReadedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Notifications::SendedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_id")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Secessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Secessions::UserId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Secessions::Reason).string_len(1024).null())
                    .col(
                        ColumnDef::new(Secessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(Secessions::Table).to_owned(),
            Table::drop().table(Notifications::Table).to_owned(),
            Table::drop().table(Passes::Table).to_owned(),
            Table::drop().table(PassPrograms::Table).to_owned(),
            Table::drop().table(Levels::Table).to_owned(),
            Table::drop().table(Points::Table).to_owned(),
            Table::drop().table(Sessions::Table).to_owned(),
            Table::drop().table(Methods::Table).to_owned(),
            Table::drop().table(Licenses::Table).to_owned(),
            Table::drop().table(Phones::Table).to_owned(),
            Table::drop().table(Users::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }

        for name in ["notification_type", "point_type", "method_provider"] {
            manager
                .drop_type(Type::drop().name(Alias::new(name)).to_owned())
                .await?;
        }

        Ok(())
    }
}
