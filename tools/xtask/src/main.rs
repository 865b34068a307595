//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-core`: 运行 exhibit-core 覆盖率
//! - `config-check`: 验证展览配置文件

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use exhibit_core::validate_json;
use walkdir::WalkDir;
use xshell::{Shell, cmd};

/// 默认的展览目录（相对于 workspace root）
const DEFAULT_EXHIBITIONS_DIR: &str = "public/assets/exhibitions";

fn ensure_cargo_llvm_cov_available(sh: &Shell) -> anyhow::Result<()> {
    if cmd!(sh, "cargo llvm-cov --version").quiet().run().is_err() {
        anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());
    let sh = Shell::new()?;

    match sub.as_str() {
        "check-all" => {
            eprintln!("\n==> cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;

            eprintln!("\n==> cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

            eprintln!("\n==> cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;
        }
        "cov-core" => {
            ensure_cargo_llvm_cov_available(&sh)?;

            eprintln!("\n==> cargo llvm-cov -p exhibit-core --html");
            cmd!(sh, "cargo llvm-cov -p exhibit-core --html").run()?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "config-check" => {
            let path = args.next();
            config_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-core        运行 exhibit-core 覆盖率报告
  config-check    验证展览配置文件

CONFIG-CHECK:
  cargo xtask config-check [path]

  不带参数：检查 public/assets/exhibitions/ 下所有 config.json
  带路径参数：检查指定文件或目录
"#
    );
}

//=============================================================================
// config-check 命令实现
//=============================================================================

/// 执行配置检查
fn config_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_config_files(&path)
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_EXHIBITIONS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认展览目录不存在: {}\n请在 workspace 根目录运行，或指定配置路径",
                    dir.display()
                );
            }
            collect_config_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到配置文件（config.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个配置文件...\n", files.len());

    let mut error_count = 0;
    let mut warn_count = 0;
    for file in &files {
        let content = match std::fs::read_to_string(file) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("[ERROR] {}: 无法读取文件 - {}", file.display(), e);
                error_count += 1;
                continue;
            }
        };

        let report = validate_json(&content);
        for error in &report.errors {
            eprintln!("[ERROR] {}: {}", file.display(), error);
        }
        for warning in &report.warnings {
            eprintln!("[WARN] {}: {}", file.display(), warning);
        }
        error_count += report.errors.len();
        warn_count += report.warnings.len();
    }

    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个配置文件", files.len());
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
        anyhow::bail!("配置检查发现错误");
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }

    Ok(())
}

/// 收集目录下的所有 config.json
fn collect_config_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == "config.json")
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}
