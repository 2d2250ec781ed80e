//! What a reconciliation run did

/// Outcome of one reconciliation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileAction {
    /// What happened to the resource
    pub action_type: ActionType,

    /// Resource type (e.g., "subnet", "route table", "instance")
    pub resource_type: String,

    /// Name tag or provider name of the resource
    pub name: String,

    /// Provider id, when known
    pub id: Option<String>,
}

/// Kind of outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// The resource was created by this run
    Created,
    /// An existing resource matched and was reused
    Reused,
    /// An association or registration was (re)applied
    Registered,
    /// The declaration was left alone
    Skipped,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Created => write!(f, "created"),
            ActionType::Reused => write!(f, "reused"),
            ActionType::Registered => write!(f, "registered"),
            ActionType::Skipped => write!(f, "skipped"),
        }
    }
}

/// Every step of a run, in execution order
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub actions: Vec<ReconcileAction>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        action_type: ActionType,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        id: Option<String>,
    ) {
        self.actions.push(ReconcileAction {
            action_type,
            resource_type: resource_type.into(),
            name: name.into(),
            id,
        });
    }

    /// Append the steps of another report
    pub fn merge(&mut self, other: ReconcileReport) {
        self.actions.extend(other.actions);
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&ReconcileAction> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            created: self.actions_by_type(ActionType::Created).len(),
            reused: self.actions_by_type(ActionType::Reused).len(),
            registered: self.actions_by_type(ActionType::Registered).len(),
            skipped: self.actions_by_type(ActionType::Skipped).len(),
        }
    }
}

/// Counts per outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub created: usize,
    pub reused: usize,
    pub registered: usize,
    pub skipped: usize,
}

impl std::fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} reused, {} registered, {} skipped",
            self.created, self.reused, self.registered, self.skipped
        )
    }
}
