/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub const PROCESS_RESIDENT_MEMORY: &str = "ProcessResidentMemory";
pub const PROCESS_VIRTUAL_MEMORY: &str = "ProcessVirtualMemory";
pub const PROCESS_CPU_USAGE: &str = "ProcessCPUUsage";
pub const PROCESS_DISK_READ: &str = "ProcessDiskRead";
pub const PROCESS_DISK_WRITTEN: &str = "ProcessDiskWritten";
pub const PROCESS_TOTAL_DISK_READ: &str = "ProcessTotalDiskRead";
pub const PROCESS_TOTAL_DISK_WRITTEN: &str = "ProcessTotalDiskWritten";
pub const PROCESS_RUN_TIME: &str = "ProcessRunTime";
pub const PROCESS_START_TIME: &str = "ProcessStartTime";

pub const RUNTIME_WORKERS: &str = "RuntimeWorkers";
pub const RUNTIME_ALIVE_TASKS: &str = "RuntimeAliveTasks";
pub const RUNTIME_GLOBAL_QUEUE_DEPTH: &str = "RuntimeGlobalQueueDepth";

pub const TOTAL_MEMORY: &str = "TotalMemory";
pub const FREE_MEMORY: &str = "FreeMemory";
pub const AVAILABLE_MEMORY: &str = "AvailableMemory";
pub const USED_MEMORY: &str = "UsedMemory";
pub const MEMORY_UTILIZATION: &str = "MemoryUtilization";

pub const TOTAL_SWAP: &str = "TotalSwap";
pub const FREE_SWAP: &str = "FreeSwap";
pub const USED_SWAP: &str = "UsedSwap";
pub const SWAP_UTILIZATION: &str = "SwapUtilization";

pub const CPU_UTILIZATION: &str = "CPUutilization1";
pub const CPU_COUNT: &str = "CPUCount";
pub const CPU_FREQUENCY: &str = "CPUFrequency";

pub const LOAD_AVERAGE_1: &str = "LoadAverage1";
pub const LOAD_AVERAGE_5: &str = "LoadAverage5";
pub const LOAD_AVERAGE_15: &str = "LoadAverage15";

pub const UPTIME: &str = "Uptime";
pub const BOOT_TIME: &str = "BootTime";

pub const RANDOM_VALUE: &str = "RandomValue";
pub const POLL_COUNT: &str = "PollCount";

pub(super) const PROCESS_GAUGES: [&str; 9] = [
    PROCESS_RESIDENT_MEMORY,
    PROCESS_VIRTUAL_MEMORY,
    PROCESS_CPU_USAGE,
    PROCESS_DISK_READ,
    PROCESS_DISK_WRITTEN,
    PROCESS_TOTAL_DISK_READ,
    PROCESS_TOTAL_DISK_WRITTEN,
    PROCESS_RUN_TIME,
    PROCESS_START_TIME,
];

pub(super) const RUNTIME_GAUGES: [&str; 3] = [
    RUNTIME_WORKERS,
    RUNTIME_ALIVE_TASKS,
    RUNTIME_GLOBAL_QUEUE_DEPTH,
];

/// Every gauge of a snapshot, in the order they are sampled.
pub const GAUGE_NAMES: [&str; 30] = [
    PROCESS_RESIDENT_MEMORY,
    PROCESS_VIRTUAL_MEMORY,
    PROCESS_CPU_USAGE,
    PROCESS_DISK_READ,
    PROCESS_DISK_WRITTEN,
    PROCESS_TOTAL_DISK_READ,
    PROCESS_TOTAL_DISK_WRITTEN,
    PROCESS_RUN_TIME,
    PROCESS_START_TIME,
    RUNTIME_WORKERS,
    RUNTIME_ALIVE_TASKS,
    RUNTIME_GLOBAL_QUEUE_DEPTH,
    TOTAL_MEMORY,
    FREE_MEMORY,
    AVAILABLE_MEMORY,
    USED_MEMORY,
    MEMORY_UTILIZATION,
    TOTAL_SWAP,
    FREE_SWAP,
    USED_SWAP,
    SWAP_UTILIZATION,
    CPU_UTILIZATION,
    CPU_COUNT,
    CPU_FREQUENCY,
    LOAD_AVERAGE_1,
    LOAD_AVERAGE_5,
    LOAD_AVERAGE_15,
    UPTIME,
    BOOT_TIME,
    RANDOM_VALUE,
];
