// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ImageAnalyses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImageAnalyses::AnalysisId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ImageAnalyses::ErrorTitle).string_len(100).not_null())
                    .col(ColumnDef::new(ImageAnalyses::ErrorCode).string().null())
                    .col(ColumnDef::new(ImageAnalyses::Product).string().null())
                    .col(ColumnDef::new(ImageAnalyses::Environment).json().null())
                    .col(ColumnDef::new(ImageAnalyses::KeyTextBlocks).json().not_null())
                    .col(ColumnDef::new(ImageAnalyses::ProbableCause).string().not_null())
                    .col(ColumnDef::new(ImageAnalyses::SuggestedFix).text().not_null())
                    .col(ColumnDef::new(ImageAnalyses::Severity).string().not_null())
                    .col(ColumnDef::new(ImageAnalyses::Confidence).double().not_null())
                    .col(ColumnDef::new(ImageAnalyses::FollowUpQuestions).json().not_null())
                    .col(ColumnDef::new(ImageAnalyses::Status).string().not_null())
                    .col(ColumnDef::new(ImageAnalyses::ImageFilename).string().not_null())
                    .col(
                        ColumnDef::new(ImageAnalyses::ImageSizeBytes)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ImageAnalyses::RequesterIp).string().not_null())
                    .col(ColumnDef::new(ImageAnalyses::UserAgent).text().not_null())
                    .col(
                        ColumnDef::new(ImageAnalyses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // History listing reads newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_image_analyses_created_at")
                    .table(ImageAnalyses::Table)
                    .col(ImageAnalyses::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_image_analyses_created_at")
                    .table(ImageAnalyses::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ImageAnalyses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ImageAnalyses {
    Table,
    AnalysisId,
    ErrorTitle,
    ErrorCode,
    Product,
    Environment,
    KeyTextBlocks,
    ProbableCause,
    SuggestedFix,
    Severity,
    Confidence,
    FollowUpQuestions,
    Status,
    ImageFilename,
    ImageSizeBytes,
    RequesterIp,
    UserAgent,
    CreatedAt,
}
