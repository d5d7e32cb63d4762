//! ログ初期化
//!
//! 標準出力へのコンパクト表示と、日次ローテーションするJSONログファイルを設定する。

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, LogConfig};

/// ログディレクトリを決定（設定値 > XDGデフォルト > カレント）
pub fn resolve_log_dir(config: &LogConfig) -> PathBuf {
    config
        .log_dir
        .clone()
        .or_else(AppConfig::default_log_dir)
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// 強化されたログ初期化
///
/// ファイル出力が有効な場合は `WorkerGuard` を返すので、プロセス終了まで保持すること。
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;

    let (file_layer, guard) = if config.enable_file_logging {
        let log_dir = resolve_log_dir(config);
        fs::create_dir_all(&log_dir).with_context(|| {
            format!("Failed to create log directory: {}", log_dir.display())
        })?;

        let (appender, removed) =
            open_rolling_log(&log_dir, &config.log_file_prefix, config.max_log_files)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false);

        eprintln!(
            "📁 Logging to {} ({} old files removed)",
            log_dir.display(),
            removed
        );
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_timer(LocalTime::rfc_3339())
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(guard)
}

/// 日次ローテーションのファイルを開いてから古いものを整理する
///
/// アペンダーは生成時に今日のファイルを作るので、整理後も `max_files` 個を超えない。
pub fn open_rolling_log(
    log_dir: &Path,
    prefix: &str,
    max_files: u32,
) -> anyhow::Result<(RollingFileAppender, usize)> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))?;
    let removed = cleanup_old_logs(log_dir, prefix, max_files);
    Ok((appender, removed))
}

/// 古いログファイルを削除し、新しいものから `max_files` 個だけ残す
///
/// 日次ローテーションのファイル名は `<prefix>.YYYY-MM-DD` なので名前順が日付順になる。
pub fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_files: u32) -> usize {
    let Some(dir) = log_dir.to_str() else {
        return 0;
    };
    let pattern = format!(
        "{}/{}*",
        glob::Pattern::escape(dir.trim_end_matches('/')),
        glob::Pattern::escape(prefix)
    );

    let mut files: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
        Err(e) => {
            eprintln!("⚠️ Invalid log file pattern {}: {}", pattern, e);
            return 0;
        }
    };

    if files.len() <= max_files as usize {
        return 0;
    }

    files.sort();
    let excess = files.len() - max_files as usize;
    files
        .iter()
        .take(excess)
        .filter(|path| fs::remove_file(path).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cleanup_keeps_newest_files() {
        let dir = tempdir().unwrap();
        for day in ["2026-10-01", "2026-10-02", "2026-10-03", "2026-10-04"] {
            fs::write(dir.path().join(format!("emcee.log.{}", day)), "x").unwrap();
        }
        fs::write(dir.path().join("other.txt"), "keep me").unwrap();

        let removed = cleanup_old_logs(dir.path(), "emcee.log", 2);
        assert_eq!(removed, 2);

        assert!(!dir.path().join("emcee.log.2026-10-01").exists());
        assert!(!dir.path().join("emcee.log.2026-10-02").exists());
        assert!(dir.path().join("emcee.log.2026-10-03").exists());
        assert!(dir.path().join("emcee.log.2026-10-04").exists());
        assert!(dir.path().join("other.txt").exists());
    }

    #[test]
    fn test_cleanup_under_limit_is_noop() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("emcee.log.2026-10-01"), "x").unwrap();
        assert_eq!(cleanup_old_logs(dir.path(), "emcee.log", 30), 0);
    }

    #[test]
    fn test_open_rolling_log_counts_todays_file() {
        let dir = tempdir().unwrap();
        for day in ["2020-01-01", "2020-01-02", "2020-01-03"] {
            fs::write(dir.path().join(format!("emcee.log.{}", day)), "x").unwrap();
        }

        let (_appender, removed) = open_rolling_log(dir.path(), "emcee.log", 2).unwrap();
        assert_eq!(removed, 2);

        let remaining: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(remaining.len(), 2, "remaining: {:?}", remaining);
        assert!(remaining.contains(&"emcee.log.2020-01-03".to_string()));
    }

    #[test]
    fn test_resolve_log_dir_prefers_config() {
        let config = LogConfig {
            log_dir: Some(PathBuf::from("/tmp/emcee-logs")),
            ..LogConfig::default()
        };
        assert_eq!(resolve_log_dir(&config), PathBuf::from("/tmp/emcee-logs"));
    }
}
