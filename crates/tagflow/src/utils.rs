use colored::Colorize;
use std::time::Duration;
use tagflow_cloud::{ReconcileReport, ReconcileSettings, UserDataSource, WaitConfig};
use tagflow_config::Settings;

/// 設定ファイルの値をエンジンの設定に変換
pub fn reconcile_settings(settings: &Settings) -> ReconcileSettings {
    ReconcileSettings {
        wait: WaitConfig {
            interval: Duration::from_secs(settings.tag_wait.interval_secs),
            timeout: Duration::from_secs(settings.tag_wait.timeout_secs),
        },
        nat_instance_name: settings.nat_instance_name.clone(),
        userdata: UserDataSource::new(&settings.userdata_dir),
        extra_tag_fields: settings.extra_tag_fields.clone(),
        debian_image_owner: settings.debian_image_owner.clone(),
        db_password_length: settings.db_password_length,
    }
}

/// プロファイル名を決定する（--profile / TAGFLOW_PROFILE → 設定ファイル）
pub fn determine_profile(profile: Option<String>, settings: &Settings) -> anyhow::Result<String> {
    profile.or_else(|| settings.profile.clone()).ok_or_else(|| {
        anyhow::anyhow!(
            "プロファイルを指定してください: tagflow <command> --profile <name> または TAGFLOW_PROFILE=<name>\n\
             tagflow.yaml の profile でも指定できます"
        )
    })
}

/// 実行結果のサマリーを表示
pub fn print_summary(report: &ReconcileReport) {
    let summary = report.summary();
    println!();
    println!("{}", "サマリー:".bold());
    println!("  作成: {}", summary.created.to_string().green());
    println!("  既存: {}", summary.reused.to_string().cyan());
    println!("  登録: {}", summary.registered.to_string().cyan());
    println!("  スキップ: {}", summary.skipped.to_string().dimmed());
    println!(
        "  所要時間: {:.1}秒",
        Duration::from_millis(report.duration_ms).as_secs_f64()
    );
}
