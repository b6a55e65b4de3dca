// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域用例模块
///
/// 当前的用例：
/// - 截图分析（analyze_image）：校验图片、调用视觉模型、规范化并持久化分析结果
pub mod analyze_image;
