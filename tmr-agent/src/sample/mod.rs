/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Mutex;

use sysinfo::{Pid, ProcessesToUpdate, System};

use tmr_types::Metric;

mod names;
pub use names::{GAUGE_NAMES, POLL_COUNT, RANDOM_VALUE};

/// The metrics of one sampling cycle, sent as a single payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    metrics: Vec<Metric>,
}

impl Snapshot {
    pub fn from_metrics(metrics: Vec<Metric>) -> Self {
        Snapshot { metrics }
    }

    #[inline]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

struct SamplerState {
    system: System,
    pid: Option<Pid>,
    poll_count: i64,
}

/// Reads process, runtime and host statistics.
pub struct Sampler {
    state: Mutex<SamplerState>,
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::new()
    }
}

impl Sampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // cpu usage is computed between two refreshes
        system.refresh_cpu_usage();
        Sampler {
            state: Mutex::new(SamplerState {
                system,
                pid: sysinfo::get_current_pid().ok(),
                poll_count: 0,
            }),
        }
    }

    pub fn poll_count(&self) -> i64 {
        self.state.lock().unwrap().poll_count
    }

    pub fn sample(&self) -> Snapshot {
        let mut state = self.state.lock().unwrap();
        state.poll_count += 1;
        let poll_count = state.poll_count;

        let mut gauges = GaugeSet::with_capacity(GAUGE_NAMES.len());
        state.read_process(&mut gauges);
        read_runtime(&mut gauges);
        state.read_memory(&mut gauges);
        state.read_cpu(&mut gauges);
        read_host(&mut gauges);
        gauges.push(RANDOM_VALUE, fastrand::f64() * 1000.0);

        let mut metrics = gauges.into_metrics();
        metrics.push(Metric::counter(POLL_COUNT, poll_count));
        Snapshot::from_metrics(metrics)
    }
}

struct GaugeSet {
    metrics: Vec<Metric>,
}

impl GaugeSet {
    fn with_capacity(n: usize) -> Self {
        GaugeSet {
            metrics: Vec::with_capacity(n + 1),
        }
    }

    /// Unreadable or out of range values are reported as zero.
    fn push(&mut self, name: &'static str, value: f64) {
        let value = if value.is_finite() && value >= 0.0 {
            value
        } else {
            0.0
        };
        self.metrics.push(Metric::gauge(name, value));
    }

    fn into_metrics(self) -> Vec<Metric> {
        self.metrics
    }
}

impl SamplerState {
    fn read_process(&mut self, gauges: &mut GaugeSet) {
        if let Some(pid) = self.pid {
            self.system
                .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        }
        let process = self.pid.and_then(|pid| self.system.process(pid));

        match process {
            Some(p) => {
                let disk = p.disk_usage();
                gauges.push(names::PROCESS_RESIDENT_MEMORY, p.memory() as f64);
                gauges.push(names::PROCESS_VIRTUAL_MEMORY, p.virtual_memory() as f64);
                gauges.push(names::PROCESS_CPU_USAGE, f64::from(p.cpu_usage()));
                gauges.push(names::PROCESS_DISK_READ, disk.read_bytes as f64);
                gauges.push(names::PROCESS_DISK_WRITTEN, disk.written_bytes as f64);
                gauges.push(names::PROCESS_TOTAL_DISK_READ, disk.total_read_bytes as f64);
                gauges.push(
                    names::PROCESS_TOTAL_DISK_WRITTEN,
                    disk.total_written_bytes as f64,
                );
                gauges.push(names::PROCESS_RUN_TIME, p.run_time() as f64);
                gauges.push(names::PROCESS_START_TIME, p.start_time() as f64);
            }
            None => {
                for name in names::PROCESS_GAUGES {
                    gauges.push(name, 0.0);
                }
            }
        }
    }

    fn read_memory(&mut self, gauges: &mut GaugeSet) {
        self.system.refresh_memory();
        let sys = &self.system;

        let total = sys.total_memory();
        let used = sys.used_memory();
        gauges.push(names::TOTAL_MEMORY, total as f64);
        gauges.push(names::FREE_MEMORY, sys.free_memory() as f64);
        gauges.push(names::AVAILABLE_MEMORY, sys.available_memory() as f64);
        gauges.push(names::USED_MEMORY, used as f64);
        gauges.push(names::MEMORY_UTILIZATION, percent(used, total));

        let swap_total = sys.total_swap();
        let swap_used = sys.used_swap();
        gauges.push(names::TOTAL_SWAP, swap_total as f64);
        gauges.push(names::FREE_SWAP, sys.free_swap() as f64);
        gauges.push(names::USED_SWAP, swap_used as f64);
        gauges.push(names::SWAP_UTILIZATION, percent(swap_used, swap_total));
    }

    fn read_cpu(&mut self, gauges: &mut GaugeSet) {
        self.system.refresh_cpu_all();
        let cpus = self.system.cpus();

        let frequency = cpus.iter().map(|c| c.frequency()).max().unwrap_or(0);
        gauges.push(
            names::CPU_UTILIZATION,
            f64::from(self.system.global_cpu_usage()),
        );
        gauges.push(names::CPU_COUNT, cpus.len() as f64);
        gauges.push(names::CPU_FREQUENCY, frequency as f64);
    }
}

fn read_runtime(gauges: &mut GaugeSet) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let metrics = handle.metrics();
            gauges.push(names::RUNTIME_WORKERS, metrics.num_workers() as f64);
            gauges.push(names::RUNTIME_ALIVE_TASKS, metrics.num_alive_tasks() as f64);
            gauges.push(
                names::RUNTIME_GLOBAL_QUEUE_DEPTH,
                metrics.global_queue_depth() as f64,
            );
        }
        Err(_) => {
            for name in names::RUNTIME_GAUGES {
                gauges.push(name, 0.0);
            }
        }
    }
}

fn read_host(gauges: &mut GaugeSet) {
    let load = System::load_average();
    gauges.push(names::LOAD_AVERAGE_1, load.one);
    gauges.push(names::LOAD_AVERAGE_5, load.five);
    gauges.push(names::LOAD_AVERAGE_15, load.fifteen);
    gauges.push(names::UPTIME, System::uptime() as f64);
    gauges.push(names::BOOT_TIME, System::boot_time() as f64);
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
