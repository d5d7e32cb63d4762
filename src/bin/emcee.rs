use clap::Parser;
use emcee::{
    api::{HelixClient, ScriptedSurface},
    config::AppConfig,
    io::{event_stream, load_events_file},
    ChatEvent, CommandOutcome, ControlSurface, EmceeResult, Orchestrator,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_stream::StreamExt;

/// ライブ配信チャットアシスタント
#[derive(Debug, Parser)]
#[command(name = "emcee", version, about = "Live-stream chat assistant")]
struct Cli {
    /// 設定ファイル（省略時はXDG設定ディレクトリの config.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// NDJSONイベントファイル（省略時は標準入力）
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// プラットフォームに接続せず、呼び出しをログに出すだけにする
    #[arg(long)]
    dry_run: bool,

    /// ドライラン時にチャットにいることにする視聴者
    #[arg(long, value_delimiter = ',')]
    chatters: Vec<String>,

    /// イベントファイルを検証して終了する
    #[arg(long, requires = "events")]
    check: bool,
}

#[tokio::main]
async fn main() -> EmceeResult<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    let (mut config, config_source) = AppConfig::load(&config_path)?;
    config.apply_env_overrides();

    // tokio-consoleの初期化（プロファイリング用）
    #[cfg(feature = "debug-tokio")]
    console_subscriber::init();

    #[cfg(not(feature = "debug-tokio"))]
    let _log_guard = emcee::logging::init_logging(&config.log)?;

    config_source.log();

    if cli.check {
        return check_feed(&cli);
    }

    tracing::info!("🎬 Starting emcee - live-stream chat assistant");

    let surface: Arc<dyn ControlSurface> = if cli.dry_run {
        tracing::info!("🧪 Dry-run mode: no platform calls will be made");
        Arc::new(ScriptedSurface::new().with_chatters(cli.chatters.clone()))
    } else {
        config.validate()?;
        Arc::new(HelixClient::with_base_url(
            config.helix.base_url.clone(),
            config.helix_credentials()?,
        ))
    };

    let mut orchestrator = Orchestrator::new(surface, config.orchestrator_settings());
    match orchestrator.initialize().await {
        Ok(count) => tracing::info!("👥 {} chatters present at startup", count),
        Err(e) => tracing::warn!("⚠️ Could not fetch present chatters, starting empty: {}", e),
    }

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.events {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(emcee::FeedError::from)?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut events = Box::pin(event_stream(reader));
    let mut outcomes: BTreeMap<String, usize> = BTreeMap::new();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("🛑 終了シグナルを受信しました");
                break;
            }
            item = events.next() => {
                match item {
                    Some(Ok(event)) => {
                        if let Some(outcome) = orchestrator.handle_event(event).await {
                            *outcomes.entry(outcome.to_string()).or_default() += 1;
                        }
                    }
                    Some(Err(e)) => tracing::warn!("⚠️ [FEED] Skipping malformed event: {}", e),
                    None => {
                        tracing::info!("📭 [FEED] Event feed ended");
                        break;
                    }
                }
            }
        }
    }

    log_summary(&outcomes);
    tracing::info!("👋 emcee shutting down");
    Ok(())
}

/// イベントファイルを検証し、種類ごとの件数を表示
fn check_feed(cli: &Cli) -> EmceeResult<()> {
    let Some(path) = cli.events.as_ref() else {
        return Ok(());
    };

    let events = load_events_file(&path.to_string_lossy())?;
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for event in &events {
        *counts.entry(event.event_name()).or_default() += 1;
    }

    println!("✅ {} events in {}", events.len(), path.display());
    for (name, count) in counts {
        println!("  {:<10} {}", name, count);
    }

    let unknown_commands: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ChatEvent::Command { command, .. }
                if emcee::commands::BuiltinCommand::parse(command).is_none() =>
            {
                Some(command.as_str())
            }
            _ => None,
        })
        .collect();
    if !unknown_commands.is_empty() {
        println!("  non-builtin commands: {}", unknown_commands.join(", "));
    }

    Ok(())
}

fn log_summary(outcomes: &BTreeMap<String, usize>) {
    let total: usize = outcomes.values().sum();
    tracing::info!(
        "📊 Handled {} commands ({} completed)",
        total,
        outcomes
            .get(&CommandOutcome::Completed.to_string())
            .copied()
            .unwrap_or(0)
    );
    for (outcome, count) in outcomes {
        tracing::debug!("  {}: {}", outcome, count);
    }
}
