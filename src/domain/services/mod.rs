// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 图片下载（image_fetcher）：按 `image_url` 下载待分析图片
/// - 回复解析（reply_parser）：从模型回复中提取 JSON 并规范化为分析记录
/// - 视觉模型服务（vision_service）：调用外部多模态补全接口
pub mod image_fetcher;
pub mod reply_parser;
pub mod vision_service;
