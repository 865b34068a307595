//! # exhibit
//!
//! 展览配置验证与检视工具。
//!
//! ## 用法
//!
//! ```bash
//! exhibit validate public/assets/exhibitions/ancient-art/config.json
//! exhibit inspect ancient-art
//! exhibit inspect ancient-art --language en --preload
//! exhibit --source zip --zip exhibitions.zip inspect ancient-art
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use exhibit_core::{ExhibitionConfig, resolve_description, validate_json};
use exhibit_host::{AppConfig, AssetSourceType, ExhibitionSession};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "exhibit")]
#[command(about = "线上展览配置验证与检视工具")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 应用配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 站点根目录（覆盖配置文件）
    #[arg(long, global = true)]
    assets_root: Option<PathBuf>,

    /// 相对 URL 的来源（覆盖配置文件）
    #[arg(long, value_enum, global = true)]
    source: Option<SourceArg>,

    /// ZIP 文件路径（zip 来源）
    #[arg(long, global = true)]
    zip: Option<PathBuf>,

    /// 站点源（http 来源）
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 验证展览配置文件
    Validate {
        /// 配置文件路径
        file: PathBuf,
    },

    /// 载入展览并输出摘要
    Inspect {
        /// 展览 ID
        exhibition_id: String,

        /// 预载所有图片并输出载入统计
        #[arg(long)]
        preload: bool,

        /// 导览文字的语言（默认：展览预设语言）
        #[arg(short, long)]
        language: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Fs,
    Zip,
    Http,
}

impl From<SourceArg> for AssetSourceType {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Fs => AssetSourceType::Fs,
            SourceArg::Zip => AssetSourceType::Zip,
            SourceArg::Http => AssetSourceType::Http,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match &cli.command {
        Commands::Validate { file } => validate(file),
        Commands::Inspect {
            exhibition_id,
            preload,
            language,
        } => {
            let config = app_config(&cli)?;
            inspect(&config, exhibition_id, *preload, language.as_deref()).await
        }
    }
}

/// 配置文件 + 命令行覆盖
fn app_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config);

    if let Some(root) = &cli.assets_root {
        config.assets_root = root.clone();
    }
    if let Some(source) = cli.source {
        config.asset_source = source.into();
    }
    if let Some(zip) = &cli.zip {
        config.zip_path = Some(zip.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }

    config.validate().context("应用配置无效")?;
    debug!(source = ?config.asset_source, mode = %config.resource.mode, "应用配置就绪");
    Ok(config)
}

fn validate(file: &Path) -> anyhow::Result<ExitCode> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("无法读取配置文件: {}", file.display()))?;

    let report = validate_json(&content);
    println!("{}", report.render());

    Ok(if report.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn inspect(
    config: &AppConfig,
    exhibition_id: &str,
    preload: bool,
    language: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let mut session = ExhibitionSession::from_config(config)?;
    session
        .open(exhibition_id)
        .await
        .with_context(|| format!("无法载入展览: {exhibition_id}"))?;

    let Some(exhibition) = session.exhibition() else {
        anyhow::bail!("展览未载入");
    };
    print_summary(exhibition, language);

    if preload {
        let images = session.images();
        let mut queued = 0;
        for scene in &exhibition.scenes {
            queued += usize::from(images.add_to_preload_queue(&scene.image.url, 0, &scene.id));
            if let Some(thumbnail) = &scene.image.thumbnail {
                queued += usize::from(images.add_to_preload_queue(thumbnail, -1, &scene.id));
            }
        }
        info!(queued, "开始预载图片");
        images.flush().await;

        println!();
        println!("{}", images.loading_stats().format());
    }

    session.close();
    Ok(ExitCode::SUCCESS)
}

fn print_summary(exhibition: &ExhibitionConfig, language: Option<&str>) {
    let language = language.unwrap_or(&exhibition.default_language);

    println!("{} ({})", exhibition.title, exhibition.id);
    println!(
        "场景: {}  语言: {}  模式: {}",
        exhibition.scene_count(),
        exhibition.available_languages.join(", "),
        exhibition.resource_config.mode
    );
    println!();

    for (index, scene) in exhibition.scenes.iter().enumerate() {
        let description =
            resolve_description(&scene.description, language, &exhibition.default_language);
        let audio = scene.audio_languages();
        println!("[{}] {} - {}", index + 1, scene.id, scene.title);
        println!("    图片: {}", scene.image.url);
        if !audio.is_empty() {
            println!("    音频: {}", audio.join(", "));
        }
        if !description.is_empty() {
            println!("    {}", description);
        }
    }
}
