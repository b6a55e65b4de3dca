// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// - 截图分析（analysis_handler）：上传入口
/// - 历史记录（history_handler）：最近的分析结果
pub mod analysis_handler;
pub mod history_handler;
