pub mod insights;
pub mod normalize;
pub mod pipeline;
pub mod pool;
pub mod ranking;
pub mod refactor;
pub mod rules;
pub mod testgen;
pub mod worker;

pub use pipeline::AnalysisPipeline;
pub use pool::{AgentStatus, PoolConfig, PoolStatus, WorkerPool};
pub use ranking::{format_issues, format_suggestions, format_tests};
pub use rules::{RuleError, RuleOutput, RuleRegistry, RuleSet};
pub use worker::{
    AgentWorker, DefaultWorkerFactory, WorkOutput, WorkRequest, Worker, WorkerFactory,
    WorkerHandle, WorkerStatus,
};
