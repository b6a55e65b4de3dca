// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：分析记录和上传图片
/// - 仓库接口（repositories）：分析记录持久化抽象接口
/// - 服务（services）：视觉模型调用和回复解析
/// - 用例（use_cases）：截图分析流程
///
/// 领域层不依赖于任何具体的存储或传输实现。
pub mod models;
pub mod repositories;
pub mod services;
pub mod use_cases;
