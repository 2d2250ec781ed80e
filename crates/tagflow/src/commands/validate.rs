use colored::Colorize;
use std::path::Path;
use tagflow_cloud::{DesiredStateStore, InstanceSpec};

pub async fn handle(file: &Path) -> anyhow::Result<()> {
    println!("{}", "宣言ファイルを検証中...".blue());

    if !file.exists() {
        eprintln!(
            "{}",
            format!("✗ 宣言ファイルが見つかりません: {}", file.display())
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    let state = DesiredStateStore::new(file).load().await?;
    let problems = state.validate();

    if !problems.is_empty() {
        eprintln!();
        eprintln!("{}", "✗ 設定エラー".red().bold());
        for (location, error) in &problems {
            eprintln!("  {}: {}", location.yellow(), error);
        }
        std::process::exit(1);
    }

    println!("{}", "✓ 宣言ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    for region in state.regions() {
        let groups = state.groups(&region)?;
        println!("  {} ({}個のAZグループ)", region.cyan(), groups.len());
        for group in &groups {
            println!("    - {}", group.name.cyan());
            for value in &group.instances {
                let spec = InstanceSpec::from_value(value)?;
                let kind = if spec.is_database() { "db" } else { "ec2" };
                println!("        {} ({}, {})", spec.name, spec.instance_type, kind);
            }
        }
    }

    Ok(())
}
