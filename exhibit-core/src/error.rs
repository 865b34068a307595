//! # Error 模块
//!
//! 定义 exhibit-core 中使用的错误类型。

use thiserror::Error;

/// 展览数据模型错误（构造不变量被破坏）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// 场景列表为空
    #[error("展览 '{exhibition}' 至少需要一个场景")]
    NoScenes { exhibition: String },

    /// 预设语言不在可用语言列表中
    #[error("预设语言 '{language}' 不在可用语言列表中")]
    DefaultLanguageUnavailable { language: String },

    /// 场景 ID 重复
    #[error("场景 ID '{scene_id}' 重复")]
    DuplicateSceneId { scene_id: String },
}

/// 核心逻辑错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// 当前场景没有该语言的音频
    #[error("当前场景没有 '{language}' 语言的音频")]
    LanguageUnavailable { language: String },

    /// 当前状态不允许此操作
    #[error("无效的状态操作: {message}")]
    InvalidState { message: String },
}
