//! # 路径与 URL 模块
//!
//! 提供统一的 URL 判断、拼接与逻辑路径规范化，所有资源抓取都使用此模块。
//!
//! ## 约定
//!
//! - 以 `http://` 或 `https://` 开头的是**绝对 URL**，永远不改写
//! - 其他 URL 都是相对的，由资源管理器按模式补上前缀
//! - 本地来源（文件系统、ZIP）使用 `/` 分隔的**逻辑路径**，不含开头的 `/`

use exhibit_core::MediaKind;

/// URL 是否已经是绝对的 HTTP(S) URL
///
/// ```
/// use exhibit_host::resources::path::is_absolute_url;
///
/// assert!(is_absolute_url("https://cdn.example.com/a.jpg"));
/// assert!(!is_absolute_url("/assets/a.jpg"));
/// ```
pub fn is_absolute_url(url: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// 拼接基础 URL 与相对路径，规范化中间的斜线
///
/// ```
/// use exhibit_host::resources::path::join_url;
///
/// assert_eq!(join_url("https://cdn.example.com/", "/a.jpg"), "https://cdn.example.com/a.jpg");
/// assert_eq!(join_url("/api/exhibitions", "spring"), "/api/exhibitions/spring");
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// 确保目录 URL 以 `/` 结尾
fn as_directory(dir: &str) -> String {
    if dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}/", dir)
    }
}

/// 静态模式下展览配置文件的 URL：`{static_path}{id}/config.json`
pub fn static_config_url(static_path: &str, exhibition_id: &str) -> String {
    format!("{}{}/config.json", as_directory(static_path), exhibition_id)
}

/// 静态模式下媒体文件的 URL：`{static_path}{id}/images|audio/{url}`
pub fn static_media_url(static_path: &str, exhibition_id: &str, kind: MediaKind, url: &str) -> String {
    format!(
        "{}{}/{}/{}",
        as_directory(static_path),
        exhibition_id,
        kind.directory(),
        url
    )
}

/// 规范化逻辑路径
///
/// 处理路径组件，包括：
/// - 统一使用 `/` 分隔符
/// - 移除开头的 `/` 与 `./`
/// - 处理 `..` 组件（不会越过根目录）
/// - 丢弃查询串与片段
///
/// ```
/// use exhibit_host::resources::path::normalize_logical_path;
///
/// assert_eq!(normalize_logical_path("/assets/exhibitions/x/config.json"), "assets/exhibitions/x/config.json");
/// assert_eq!(normalize_logical_path("a/../b.png"), "b.png");
/// ```
pub fn normalize_logical_path(path: &str) -> String {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .replace('\\', "/");

    let mut components = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(component),
        }
    }

    components.join("/")
}
