// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 分析记录（analysis）：截图分析的规范化结果及其分类枚举
/// - 图片上传（image_upload）：待分析图片及其上传校验规则
pub mod analysis;
pub mod image_upload;
