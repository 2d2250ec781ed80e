mod commands;
mod prompt;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tagflow_cloud::CloudError;

#[derive(Parser)]
#[command(name = "tagflow")]
#[command(about = "タグで宣言し、タグで見つける。AWS環境を冪等に構築する。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 宣言ファイルに従ってネットワーク・インスタンス・DBを作成
    Create {
        /// 宣言ファイル (YAML)
        file: PathBuf,
        /// Internet Gateway への接続確認に自動で yes と答える
        #[arg(short, long)]
        yes: bool,
    },
    /// インスタンスの一覧を表示
    Ls {
        /// AWSプロファイル
        #[arg(short, long, env = "TAGFLOW_PROFILE")]
        profile: Option<String>,
    },
    /// インスタンス (i-...) またはDBインスタンスを削除
    Rm {
        /// 削除するID
        #[arg(required = true)]
        ids: Vec<String>,
        /// AWSプロファイル
        #[arg(short, long, env = "TAGFLOW_PROFILE")]
        profile: Option<String>,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 宣言ファイルを検証（AWSには接続しない）
    Validate {
        /// 宣言ファイル (YAML)
        file: PathBuf,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 進捗はすべて標準出力へ
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("tagflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = match tagflow_config::load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", "✗ 設定ファイルエラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Create { file, yes } => commands::create::handle(&file, yes, &settings).await,
        Commands::Ls { profile } => commands::ls::handle(profile, &settings).await,
        Commands::Rm { ids, profile, yes } => {
            commands::rm::handle(&ids, profile, yes, &settings).await
        }
        Commands::Validate { file } => commands::validate::handle(&file).await,
        Commands::Version => Ok(()),
    };

    if let Err(e) = result {
        println!();
        match e.downcast_ref::<CloudError>() {
            Some(CloudError::OperatorAbort(reason)) => {
                println!("{}", "✗ 中断しました".yellow().bold());
                println!("  {}", reason);
            }
            _ => {
                println!("{}", "✗ エラー".red().bold());
                println!("  {:#}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
