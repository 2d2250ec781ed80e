//! TagFlow reconciliation engine
//!
//! Reads a desired-state document of compute and managed-database instances
//! and drives the provider towards it with existence-checked, tag-identified
//! create and associate calls. The provider account is the source of truth:
//! a resource exists when a resource with its `Name` tag exists.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   TagFlow CLI                    │
//! │              (tagflow create/ls/rm)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 tagflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │             ReconcileDriver               │   │
//! │  │  region -> AZ group -> instance           │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────────┐    │
//! │  │ Network  │ │ Compute  │ │   Database   │    │
//! │  └──────────┘ └──────────┘ └──────────────┘    │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────────┐    │
//! │  │ TagIndex │ │   Wait   │ │ LoadBalancer │    │
//! │  └──────────┘ └──────────┘ └──────────────┘    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          trait CloudApi { ... }           │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ tagflow-cloud │
//!           │     -aws      │
//!           └───────────────┘
//! ```

pub mod api;
pub mod balancer;
pub mod compute;
pub mod confirm;
pub mod context;
pub mod database;
pub mod error;
pub mod model;
pub mod network;
pub mod reconcile;
pub mod report;
pub mod state;
pub mod tag_index;
pub mod userdata;
pub mod wait;

// Re-exports
pub use api::{
    BlockDevice, BlockDeviceSpec, CloudApi, CloudRegistry, DbInstanceRequest,
    DbSubnetGroupRequest, ImageInfo, IngressRule, InstanceSummary, Listener, LoadBalancerRequest,
    ParamValue, ResourceKind, RouteTarget, RunInstanceRequest, SecurityGroupRequest,
};
pub use balancer::LoadBalancerBinder;
pub use compute::ComputeProvisioner;
pub use confirm::{AutoConfirm, Confirm};
pub use context::{ProvisionContext, ReconcileSettings};
pub use database::DatabaseProvisioner;
pub use error::{CloudError, Result};
pub use model::{AzGroup, DesiredState, InstanceSpec, NetworkDescriptor, RegionStep, Shape};
pub use network::{NetworkProvisioner, RouteTopology};
pub use reconcile::ReconcileDriver;
pub use report::{ActionType, ReconcileAction, ReconcileReport, ReportSummary};
pub use state::DesiredStateStore;
pub use tag_index::TagIndex;
pub use userdata::UserDataSource;
pub use wait::WaitConfig;
