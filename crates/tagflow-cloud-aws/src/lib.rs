//! TagFlow AWS provider
//!
//! Implements [`tagflow_cloud::CloudApi`] on top of the AWS SDK:
//!
//! - EC2 for VPC networking, images, instances, security groups and tags
//! - RDS for DB subnet groups and DB instances
//! - Classic ELB for load balancers
//!
//! Credentials and region come from named profiles in the shared AWS config
//! files. [`AwsRegistry`] builds each profile's client once per run.

pub mod cloud;
pub mod context;
mod ec2;
mod elb;
pub mod error;
mod rds;
pub mod registry;

pub use cloud::AwsCloud;
pub use context::AwsContext;
pub use error::classify;
pub use registry::AwsRegistry;
