use crate::prompt::StdinConfirm;
use crate::utils;
use colored::Colorize;
use std::path::Path;
use tagflow_cloud::{AutoConfirm, Confirm, DesiredStateStore, ReconcileDriver};
use tagflow_cloud_aws::AwsRegistry;
use tagflow_config::Settings;

pub async fn handle(file: &Path, yes: bool, settings: &Settings) -> anyhow::Result<()> {
    if !file.exists() {
        eprintln!(
            "{}",
            format!("✗ 宣言ファイルが見つかりません: {}", file.display())
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    println!("{}", "宣言ファイルを読み込み中...".blue());
    println!("  • {}", file.display().to_string().cyan());

    let store = DesiredStateStore::new(file);
    let mut state = store.load().await?;

    let regions = state.regions();
    println!("プロファイル: {}", regions.join(", ").cyan());

    let reconcile_settings = utils::reconcile_settings(settings);
    let registry = AwsRegistry::new();
    let auto = AutoConfirm(true);
    let confirm: &dyn Confirm = if yes { &auto } else { &StdinConfirm };

    println!();
    println!("{}", "構築を開始します...".blue().bold());
    let driver = ReconcileDriver::new(&registry, &reconcile_settings, confirm, &store);
    let report = driver.run(&mut state).await?;

    utils::print_summary(&report);
    println!();
    println!("{}", "✓ 構築が完了しました！".green().bold());

    Ok(())
}
