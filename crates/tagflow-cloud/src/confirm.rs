//! Operator confirmation gate
//!
//! Costly or irreversible actions (attaching a subnet to the Internet
//! gateway, destroying resources) ask before proceeding. The engine only sees
//! this trait; the CLI decides whether the answer comes from a terminal or
//! from an automatic policy.

/// Answers a yes/no question
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Fixed answer, for non-interactive runs
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::info!(prompt = %prompt, answer = self.0, "Answered automatically");
        self.0
    }
}
