//! # Resource Source 模块
//!
//! 资源抓取抽象层，支持从不同来源（文件系统、ZIP 包、HTTP）读取展览配置与媒体。
//!
//! ## 设计原则
//!
//! - 资源以 URL 字符串寻址，和展览配置中出现的形式一致
//! - 相对 URL 由本地来源解析为**逻辑路径**（见 `super::path`）
//! - 绝对 HTTP(S) URL 只能由 [`HttpFetcher`] 抓取，[`RoutedFetcher`] 负责分派

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::ResourceError;
use super::path::{is_absolute_url, join_url, normalize_logical_path};

/// 资源抓取 trait
///
/// 抽象读取接口，允许从不同来源加载资源：
/// - `FsFetcher`：从文件系统读取（开发模式）
/// - `ZipFetcher`：从 ZIP 包读取（发布模式）
/// - `HttpFetcher`：通过 HTTP 读取（远端 API / CDN）
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 读取资源字节
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError>;

    /// 资源的完整位置（用于调试/日志）
    fn describe(&self, url: &str) -> String;
}

/// 文件系统来源
///
/// 把 URL 路径映射到本地根目录下，`/assets/a.jpg` 对应 `{root}/assets/a.jpg`。
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        self.root.join(normalize_logical_path(url))
    }
}

#[async_trait]
impl Fetcher for FsFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        if is_absolute_url(url) {
            return Err(ResourceError::LoadFailed {
                path: url.to_string(),
                kind: "file".to_string(),
                message: "文件系统来源无法读取远端 URL".to_string(),
            });
        }

        let full_path = self.resolve(url);
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ResourceError::NotFound {
                path: full_path.to_string_lossy().to_string(),
            }),
            Err(e) => Err(ResourceError::LoadFailed {
                path: full_path.to_string_lossy().to_string(),
                kind: "file".to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn describe(&self, url: &str) -> String {
        self.resolve(url).to_string_lossy().to_string()
    }
}

/// ZIP 文件来源
///
/// 从打包的展览 ZIP 读取资源。条目索引只构建一次，克隆之间共享。
///
/// 打开与解压在阻塞线程池中进行，不占用异步运行时的工作线程。
#[derive(Clone)]
pub struct ZipFetcher {
    zip_path: PathBuf,
    /// 逻辑路径 -> ZIP 内索引
    index_cache: Arc<Mutex<Option<Arc<HashMap<String, usize>>>>>,
}

impl ZipFetcher {
    pub fn new(zip_path: impl Into<PathBuf>) -> Self {
        Self {
            zip_path: zip_path.into(),
            index_cache: Arc::new(Mutex::new(None)),
        }
    }

    fn open_archive(&self) -> Result<zip::ZipArchive<File>, ResourceError> {
        let file = File::open(&self.zip_path).map_err(|e| ResourceError::LoadFailed {
            path: self.zip_path.to_string_lossy().to_string(),
            kind: "zip".to_string(),
            message: format!("无法打开 ZIP 文件: {}", e),
        })?;

        zip::ZipArchive::new(file).map_err(|e| ResourceError::LoadFailed {
            path: self.zip_path.to_string_lossy().to_string(),
            kind: "zip".to_string(),
            message: format!("无法读取 ZIP 文件: {}", e),
        })
    }

    fn build_index(&self) -> Result<HashMap<String, usize>, ResourceError> {
        let mut archive = self.open_archive()?;

        let mut index = HashMap::new();
        for i in 0..archive.len() {
            if let Ok(file) = archive.by_index(i)
                && !file.is_dir()
            {
                index.insert(normalize_logical_path(file.name()), i);
            }
        }

        debug!(zip = %self.zip_path.display(), entries = index.len(), "ZIP 索引已建立");
        Ok(index)
    }

    fn index(&self) -> Result<Arc<HashMap<String, usize>>, ResourceError> {
        let mut cache = self
            .index_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = cache.as_ref() {
            return Ok(index.clone());
        }
        let index = Arc::new(self.build_index()?);
        *cache = Some(index.clone());
        Ok(index)
    }

    fn read_entry(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let entry_path = normalize_logical_path(url);
        let index = self.index()?;
        let file_index = *index
            .get(&entry_path)
            .ok_or_else(|| ResourceError::NotFound {
                path: self.describe(url),
            })?;

        let mut archive = self.open_archive()?;
        let mut zip_file = archive
            .by_index(file_index)
            .map_err(|e| ResourceError::LoadFailed {
                path: entry_path.clone(),
                kind: "zip_entry".to_string(),
                message: format!("无法读取 ZIP 条目: {}", e),
            })?;

        let mut buffer = Vec::new();
        zip_file
            .read_to_end(&mut buffer)
            .map_err(|e| ResourceError::LoadFailed {
                path: entry_path,
                kind: "zip_read".to_string(),
                message: format!("读取 ZIP 条目失败: {}", e),
            })?;

        Ok(buffer)
    }
}

#[async_trait]
impl Fetcher for ZipFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        if is_absolute_url(url) {
            return Err(ResourceError::LoadFailed {
                path: url.to_string(),
                kind: "zip".to_string(),
                message: "ZIP 来源无法读取远端 URL".to_string(),
            });
        }

        let reader = self.clone();
        let entry_url = url.to_string();
        tokio::task::spawn_blocking(move || reader.read_entry(&entry_url))
            .await
            .map_err(|e| ResourceError::LoadFailed {
                path: self.describe(url),
                kind: "zip".to_string(),
                message: format!("ZIP 读取任务中断: {}", e),
            })?
    }

    fn describe(&self, url: &str) -> String {
        format!(
            "zip://{}#{}",
            self.zip_path.display(),
            normalize_logical_path(url)
        )
    }
}

/// HTTP 来源
///
/// 非 2xx 响应视为失败。相对 URL 拼接到 `base_url` 上；没有 `base_url` 时只能抓取绝对 URL。
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, base_url: Option<String>) -> Result<Self, ResourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResourceError::Misconfigured {
                message: format!("无法创建 HTTP 客户端: {}", e),
            })?;

        Ok(Self { client, base_url })
    }

    fn resolve(&self, url: &str) -> Result<String, ResourceError> {
        if is_absolute_url(url) {
            return Ok(url.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(join_url(base, url)),
            None => Err(ResourceError::Misconfigured {
                message: format!("相对 URL 需要配置 base_url: {}", url),
            }),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let full_url = self.resolve(url)?;

        let response = self
            .client
            .get(&full_url)
            .send()
            .await
            .map_err(|e| ResourceError::LoadFailed {
                path: full_url.clone(),
                kind: "http".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResourceError::HttpStatus {
                url: full_url,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ResourceError::LoadFailed {
                path: full_url,
                kind: "http".to_string(),
                message: e.to_string(),
            })?;

        Ok(bytes.to_vec())
    }

    fn describe(&self, url: &str) -> String {
        self.resolve(url).unwrap_or_else(|_| url.to_string())
    }
}

/// 按 URL 形式分派的来源：绝对 URL 走远端，其他走本地
#[derive(Clone)]
pub struct RoutedFetcher {
    local: Arc<dyn Fetcher>,
    remote: Arc<dyn Fetcher>,
}

impl RoutedFetcher {
    pub fn new(local: Arc<dyn Fetcher>, remote: Arc<dyn Fetcher>) -> Self {
        Self { local, remote }
    }

    fn route(&self, url: &str) -> &dyn Fetcher {
        if is_absolute_url(url) {
            self.remote.as_ref()
        } else {
            self.local.as_ref()
        }
    }
}

#[async_trait]
impl Fetcher for RoutedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        self.route(url).fetch(url).await
    }

    fn describe(&self, url: &str) -> String {
        self.route(url).describe(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    #[tokio::test]
    async fn test_fs_fetcher_reads_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("assets/exhibitions/x");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("config.json"), b"{}").unwrap();

        let fetcher = FsFetcher::new(dir.path());
        let bytes = fetcher
            .fetch("/assets/exhibitions/x/config.json")
            .await
            .unwrap();
        assert_eq!(bytes, b"{}");

        let missing = fetcher.fetch("/assets/missing.json").await.unwrap_err();
        assert!(matches!(missing, ResourceError::NotFound { .. }));

        let remote = fetcher.fetch("https://cdn.test/a.jpg").await.unwrap_err();
        assert!(matches!(remote, ResourceError::LoadFailed { .. }));
    }

    #[tokio::test]
    async fn test_zip_fetcher_reads_entries() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("exhibition.zip");
        {
            let file = File::create(&zip_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            writer
                .start_file("assets/exhibitions/x/config.json", options)
                .unwrap();
            writer.write_all(b"{\"id\":\"x\"}").unwrap();
            writer.finish().unwrap();
        }

        let fetcher = ZipFetcher::new(&zip_path);
        let bytes = fetcher
            .fetch("/assets/exhibitions/x/config.json")
            .await
            .unwrap();
        assert_eq!(bytes, b"{\"id\":\"x\"}");

        let missing = fetcher.fetch("assets/other.json").await.unwrap_err();
        assert!(matches!(missing, ResourceError::NotFound { .. }));
        assert!(
            fetcher
                .describe("./assets/other.json")
                .ends_with("#assets/other.json")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zip_fetcher_concurrent_reads_share_index() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("media.zip");
        {
            let file = File::create(&zip_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = SimpleFileOptions::default();
            for i in 0..4 {
                writer
                    .start_file(format!("images/{i}.jpg"), options)
                    .unwrap();
                writer.write_all(format!("image-{i}").as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }

        let fetcher = ZipFetcher::new(&zip_path);
        let copy = fetcher.clone();
        let reads = (0..8).map(|n| {
            let fetcher = if n % 2 == 0 { &fetcher } else { &copy };
            let url = format!("/images/{}.jpg", n % 4);
            async move { fetcher.fetch(&url).await }
        });
        let results = futures::future::join_all(reads).await;

        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), format!("image-{}", n % 4).into_bytes());
        }
        assert!(Arc::ptr_eq(&fetcher.index_cache, &copy.index_cache));
        assert_eq!(
            fetcher
                .index_cache
                .lock()
                .unwrap()
                .as_ref()
                .map(|index| index.len()),
            Some(4)
        );
    }

    #[test]
    fn test_http_fetcher_resolves_relative_urls() {
        let fetcher =
            HttpFetcher::new(Duration::from_secs(1), Some("https://museum.test/".to_string()))
                .unwrap();
        assert_eq!(
            fetcher.describe("/api/exhibitions/x"),
            "https://museum.test/api/exhibitions/x"
        );
        assert_eq!(fetcher.describe("https://cdn.test/a.jpg"), "https://cdn.test/a.jpg");

        let bare = HttpFetcher::new(Duration::from_secs(1), None).unwrap();
        assert!(matches!(
            bare.resolve("/api/x"),
            Err(ResourceError::Misconfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_routed_fetcher_dispatches_by_scheme() {
        let local = Arc::new(MockFetcher::new().with("/a.jpg", b"local".to_vec()));
        let remote = Arc::new(MockFetcher::new().with("https://cdn.test/a.jpg", b"remote".to_vec()));
        let routed = RoutedFetcher::new(local.clone(), remote.clone());

        assert_eq!(routed.fetch("/a.jpg").await.unwrap(), b"local");
        assert_eq!(routed.fetch("https://cdn.test/a.jpg").await.unwrap(), b"remote");
        assert_eq!(local.call_count(), 1);
        assert_eq!(remote.call_count(), 1);
    }
}
