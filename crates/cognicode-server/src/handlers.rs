use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use cognicode_agents::{AgentStatus, PoolStatus};
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" once the pool is initialized, "degraded" otherwise.
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub environment: String,
    pub uptime_seconds: i64,
    pub agents: PoolStatus,
    pub memory: MemoryUsage,
    pub cache: CacheSummary,
    pub sessions: SessionSummary,
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub process_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct CacheSummary {
    pub entries: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub hit_rate: f64,
    pub evictions: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub active: usize,
    pub peak: usize,
    pub total: usize,
    pub requests_handled: u64,
    pub requests_failed: u64,
    pub average_request_ms: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsStatusResponse {
    pub agents: Vec<AgentStatus>,
    pub pool_status: PoolStatus,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let agents = state.pool.status();
    let status = if agents.initialized { "healthy" } else { "degraded" };
    let stats = state.cache.stats();
    let request_metrics = state.coordinator.metrics();

    Json(HealthResponse {
        status,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.server.environment.clone(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        agents,
        memory: memory_usage(),
        cache: CacheSummary {
            entries: stats.entry_count,
            capacity: stats.capacity,
            ttl_secs: stats.ttl_secs,
            hit_rate: stats.hit_rate(),
            evictions: stats.evictions,
        },
        sessions: SessionSummary {
            active: state.sessions.active(),
            peak: state.sessions.peak(),
            total: state.sessions.total(),
            requests_handled: request_metrics.handled(),
            requests_failed: request_metrics.failed(),
            average_request_ms: request_metrics.average_millis(),
        },
    })
}

pub async fn agents_status(State(state): State<AppState>) -> Json<AgentsStatusResponse> {
    Json(AgentsStatusResponse {
        agents: state.pool.agent_statuses(),
        pool_status: state.pool.status(),
    })
}

fn memory_usage() -> MemoryUsage {
    let mut sys = System::new();
    sys.refresh_memory();

    let process_bytes = match sysinfo::get_current_pid() {
        Ok(pid) => {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            sys.process(pid).map(|process| process.memory()).unwrap_or(0)
        }
        Err(_) => 0,
    };

    let total = sys.total_memory();
    let used = sys.used_memory();
    MemoryUsage {
        total_bytes: total,
        used_bytes: used,
        available_bytes: sys.available_memory(),
        process_bytes,
        usage_percent: if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        },
    }
}
