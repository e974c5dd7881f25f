mod commands;
mod output;
mod project;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use storeflow_cloud::CancellationToken;

#[derive(Parser)]
#[command(name = "store")]
#[command(about = "宣言したストレージを、クラウドと揃える。", long_about = None)]
struct Cli {
    /// マニフェストのパス (省略時は自動検索)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// マニフェストと状態の差分を表示
    Plan,
    /// 差分を適用（状態がなければ全て作成）
    Apply,
    /// リモートの一覧で状態を更新
    Refresh,
    /// 状態にあるストレージを全て削除
    Destroy {
        /// 確認なしで削除する
        #[arg(short, long)]
        yes: bool,
    },
    /// マニフェストを検証
    Validate,
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: bool) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if verbose {
        filter = filter.add_directive(tracing::Level::DEBUG.into());
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Ctrl-C で進行中のサイクルをキャンセルする
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "中断要求を受け付けました。処理中の項目で停止します...".yellow());
            child.cancel();
        }
    });
    token
}

/// --config 指定がなければマニフェストを自動検索する
fn resolve_manifest(config: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match config {
        Some(path) => Ok(path),
        None => Ok(storeflow_config::find_manifest()?),
    }
}

fn load_project(config: Option<PathBuf>) -> anyhow::Result<project::Project> {
    project::Project::load(&resolve_manifest(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // コマンドディスパッチ
    let ok = match cli.command {
        // Versionコマンドはマニフェスト不要
        Commands::Version => {
            println!("storeflow {}", env!("CARGO_PKG_VERSION"));
            true
        }
        Commands::Validate => commands::validate::handle(&resolve_manifest(cli.config)?),
        Commands::Plan => {
            let project = load_project(cli.config)?;
            commands::plan::handle(&project).await?
        }
        Commands::Apply => {
            let project = load_project(cli.config)?;
            commands::apply::handle(&project, cancel_on_ctrl_c()).await?
        }
        Commands::Refresh => {
            let project = load_project(cli.config)?;
            commands::refresh::handle(&project, cancel_on_ctrl_c()).await?
        }
        Commands::Destroy { yes } => {
            let project = load_project(cli.config)?;
            commands::destroy::handle(&project, yes, cancel_on_ctrl_c()).await?
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
