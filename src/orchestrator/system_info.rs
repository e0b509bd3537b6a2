//! Host snapshot attached to composite reports.
//!
//! Every field has a non-empty fallback so consumers can rely on its
//! presence even where `sysinfo` reports nothing.

use crate::utils::serde::duration_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use sysinfo::System;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub platform: String,
    pub architecture: String,
    pub cpu_cores: u32,
    pub memory: MemoryInfo,
    /// Time since the orchestrator was created
    #[serde(rename = "uptime_ms", with = "duration_ms")]
    pub uptime: Duration,
    pub environment: BTreeMap<String, String>,
}

impl SystemInfo {
    pub fn capture(started_at: Instant, environment: &str, version: &str) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let total_bytes = sys.total_memory().max(1);
        let used_bytes = sys.used_memory().min(total_bytes);
        let available_bytes = match sys.available_memory() {
            0 => total_bytes - used_bytes,
            available => available,
        };

        let platform = System::long_os_version()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| std::env::consts::OS.to_string());

        let mut env = BTreeMap::new();
        env.insert("environment".to_string(), non_empty(environment));
        env.insert("version".to_string(), non_empty(version));
        env.insert("pid".to_string(), std::process::id().to_string());

        Self {
            hostname: System::host_name()
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            platform,
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: detect_cpu_cores(),
            memory: MemoryInfo {
                total_bytes,
                used_bytes,
                available_bytes,
            },
            uptime: started_at.elapsed().max(Duration::from_millis(1)),
            environment: env,
        }
    }
}

fn detect_cpu_cores() -> u32 {
    std::thread::available_parallelism()
        .ok()
        .and_then(|cores| u32::try_from(cores.get()).ok())
        .unwrap_or(1)
}

fn non_empty(value: &str) -> String {
    if value.trim().is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}
