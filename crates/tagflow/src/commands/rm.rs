use crate::prompt::StdinConfirm;
use crate::utils;
use colored::Colorize;
use tagflow_cloud::{AutoConfirm, CloudApi, CloudRegistry, Confirm};
use tagflow_cloud_aws::AwsRegistry;
use tagflow_config::Settings;

pub async fn handle(
    ids: &[String],
    profile: Option<String>,
    yes: bool,
    settings: &Settings,
) -> anyhow::Result<()> {
    let confirm: Box<dyn Confirm> = if yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirm)
    };

    if !confirm.confirm(&destroy_prompt(ids)) {
        println!("aborting.");
        return Ok(());
    }

    let profile = utils::determine_profile(profile, settings)?;
    let registry = AwsRegistry::new();
    let api = registry.client(&profile).await?;

    destroy(api.as_ref(), ids).await
}

pub fn destroy_prompt(ids: &[String]) -> String {
    format!("REALLY DESTROY {}? [y/N] ", ids.join(","))
}

/// `i-` で始まるIDはインスタンス、それ以外はDBインスタンス識別子
pub fn partition_ids(ids: &[String]) -> (Vec<String>, Vec<String>) {
    ids.iter().cloned().partition(|id| id.starts_with("i-"))
}

async fn destroy(api: &dyn CloudApi, ids: &[String]) -> anyhow::Result<()> {
    let (instances, databases) = partition_ids(ids);

    for db in &databases {
        api.delete_db_instance(db).await?;
        println!("{} {}", "deleting".yellow(), db);
    }

    if !instances.is_empty() {
        api.terminate_instances(&instances).await?;
        println!("{} {}", "terminating".yellow(), instances.join(", "));
    }

    Ok(())
}
