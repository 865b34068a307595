//! # Resource Error 模块
//!
//! 定义资源抓取与展览载入相关的错误类型。

use thiserror::Error;

/// 资源错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// 资源加载失败（IO、网络等）
    #[error("加载 {kind} 资源失败: {path} - {message}")]
    LoadFailed {
        /// 资源路径或 URL
        path: String,
        /// 来源类型（file, zip, http 等）
        kind: String,
        /// 错误消息
        message: String,
    },

    /// 资源未找到
    #[error("资源未找到: {path}")]
    NotFound {
        /// 资源路径
        path: String,
    },

    /// 非 2xx 响应
    #[error("HTTP {status}: {url}")]
    HttpStatus {
        /// 请求 URL
        url: String,
        /// 状态码
        status: u16,
    },

    /// 无效的资源格式（JSON 解析失败、不变量被破坏等）
    #[error("无效的资源格式: {path} - {message}")]
    InvalidFormat {
        /// 资源路径
        path: String,
        /// 错误消息
        message: String,
    },

    /// 资源配置错误（在任何 IO 之前发现）
    #[error("资源配置错误: {message}")]
    Misconfigured {
        /// 错误消息
        message: String,
    },

    /// 主要来源与备援来源都失败
    #[error("主要来源与备援来源都失败。主要: {primary}；备援: {fallback}")]
    FallbackFailed {
        /// 主要来源的错误消息
        primary: String,
        /// 备援来源的错误消息
        fallback: String,
    },
}

impl ResourceError {
    /// 是否为配置错误
    pub fn is_misconfigured(&self) -> bool {
        matches!(self, Self::Misconfigured { .. })
    }
}
