#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Planning,
    CheckingSolver,
    Running,
    Merging,
    Completed,
}

impl BatchStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::CheckingSolver => "checking-solver",
            Self::Running => "running",
            Self::Merging => "merging",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchProgressEvent {
    pub stage: BatchStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    /// Jobs finished so far and jobs dispatched, while running
    pub jobs: Option<(usize, usize)>,
}

impl BatchProgressEvent {
    pub fn stage(stage: BatchStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            jobs: None,
        }
    }

    /// Fraction of dispatched jobs finished, when known.
    pub fn fraction_complete(&self) -> Option<f64> {
        self.jobs
            .map(|(done, total)| if total == 0 { 1.0 } else { done as f64 / total as f64 })
    }
}
