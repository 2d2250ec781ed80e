//! AWS error classification
//!
//! Errors are classified by their `.code()` rather than by message text. A
//! `*.NotFound` on a resource this run just created means the provider has
//! not materialized it yet, which is the only retryable class. Everything
//! else is a provider rejection carrying the raw provider message.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use tagflow_cloud::CloudError;

/// Codes returned while a just-created resource is not visible yet
const NOT_VISIBLE_CODES: &[&str] = &[
    "InvalidSubnetID.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidInstanceID.NotFound",
    "InvalidVpcID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidVolume.NotFound",
    "InvalidID",
];

/// Codes meaning "no such resource" on existence probes
pub(crate) const DB_SUBNET_GROUP_NOT_FOUND: &str = "DBSubnetGroupNotFoundFault";
pub(crate) const DB_INSTANCE_NOT_FOUND: &str = "DBInstanceNotFound";

/// Classify an AWS error code into the engine's error taxonomy
pub fn classify(operation: &str, code: Option<&str>, message: Option<&str>) -> CloudError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_VISIBLE_CODES.contains(&c) => CloudError::NotVisible(message),
        _ => CloudError::Provider {
            operation: operation.to_string(),
            code: code.map(str::to_string),
            message,
        },
    }
}

/// Map an SDK error of `operation` through [`classify`]
pub(crate) fn sdk_error<E>(operation: &str, error: E) -> CloudError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let fallback = error.to_string();
    classify(
        operation,
        error.code(),
        Some(error.message().unwrap_or(fallback.as_str())),
    )
}

/// Response field missing from an otherwise successful call
pub(crate) fn missing(operation: &str, field: &str) -> CloudError {
    CloudError::provider(operation, format!("response carries no {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_on_new_resource_is_not_visible() {
        let err = classify(
            "CreateTags",
            Some("InvalidSubnetID.NotFound"),
            Some("The subnet ID 'subnet-123' does not exist"),
        );
        assert!(err.is_not_visible());

        let err = classify("CreateTags", Some("InvalidInstanceID.NotFound"), None);
        assert!(err.is_not_visible());
    }

    #[test]
    fn test_other_codes_are_provider_rejections() {
        let err = classify(
            "RunInstances",
            Some("InstanceLimitExceeded"),
            Some("You have requested more instances than your current instance limit"),
        );
        match err {
            CloudError::Provider {
                operation,
                code,
                message,
            } => {
                assert_eq!(operation, "RunInstances");
                assert_eq!(code.as_deref(), Some("InstanceLimitExceeded"));
                assert!(message.contains("instance limit"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_code() {
        let err = classify("DescribeImages", None, None);
        assert!(matches!(
            err,
            CloudError::Provider { code: None, ref message, .. } if message == "Unknown error"
        ));
    }
}
