use crate::utils;
use colored::Colorize;
use tagflow_cloud::{CloudRegistry, InstanceSummary};
use tagflow_cloud_aws::AwsRegistry;
use tagflow_config::Settings;

pub async fn handle(profile: Option<String>, settings: &Settings) -> anyhow::Result<()> {
    let profile = utils::determine_profile(profile, settings)?;
    let registry = AwsRegistry::new();
    let api = registry.client(&profile).await?;

    for instance in api.list_instances().await? {
        let line = format_instance(&instance);
        if instance.name.is_some() {
            println!("{}", line);
        } else {
            println!("{}", line.yellow());
        }
    }

    Ok(())
}

/// `<id> <Name> (<type>) - [<state>]`、Name タグが無ければ警告形式
pub fn format_instance(instance: &InstanceSummary) -> String {
    match &instance.name {
        Some(name) => format!(
            "{} {} ({}) - [{}]",
            instance.id, name, instance.instance_type, instance.state
        ),
        None => format!(
            "/!\\ {} has no tag name [{}]",
            instance.id, instance.state
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: Option<&str>) -> InstanceSummary {
        InstanceSummary {
            id: "i-0abc".to_string(),
            name: name.map(str::to_string),
            instance_type: "t3.micro".to_string(),
            state: "running".to_string(),
        }
    }

    #[test]
    fn test_format_named_instance() {
        assert_eq!(
            format_instance(&instance(Some("foo-www-1"))),
            "i-0abc foo-www-1 (t3.micro) - [running]"
        );
    }

    #[test]
    fn test_format_untagged_instance() {
        assert_eq!(
            format_instance(&instance(None)),
            "/!\\ i-0abc has no tag name [running]"
        );
    }
}
