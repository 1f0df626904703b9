//! Host and process statistics.

use metricol_core::Metric;
use rand::Rng;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::warn;

/// Counter incremented once per poll.
pub const POLL_COUNT: &str = "PollCount";

/// Gauge set to a fresh random number on each poll.
pub const RANDOM_VALUE: &str = "RandomValue";

/// Gauges describing the agent's own process.
pub const PROCESS_GAUGES: [&str; 6] = [
    "ProcessMemory",
    "ProcessVirtualMemory",
    "ProcessCPUutilization",
    "ProcessRunTime",
    "ProcessDiskRead",
    "ProcessDiskWritten",
];

/// Samples memory, CPU and load statistics of the local host, and memory,
/// CPU and I/O of the agent process itself.
pub struct HostStats {
    system: System,
    pid: Option<Pid>,
}

impl HostStats {
    /// Create a sampler. CPU usage is measured between refreshes, so the
    /// first sample may report zero utilisation.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!(error = e, "Process statistics unavailable");
                None
            }
        };

        Self { system, pid }
    }

    /// Take one sample: host gauges, process gauges, then `RandomValue` and
    /// a `PollCount` of 1.
    pub fn sample(&mut self) -> Vec<Metric> {
        self.system.refresh_memory();
        self.system.refresh_cpu_all();

        let mut metrics = vec![
            Metric::gauge("TotalMemory", self.system.total_memory() as f64),
            Metric::gauge("FreeMemory", self.system.free_memory() as f64),
            Metric::gauge("UsedMemory", self.system.used_memory() as f64),
            Metric::gauge("AvailableMemory", self.system.available_memory() as f64),
            Metric::gauge("TotalSwap", self.system.total_swap() as f64),
            Metric::gauge("UsedSwap", self.system.used_swap() as f64),
        ];

        for (i, cpu) in self.system.cpus().iter().enumerate() {
            metrics.push(Metric::gauge(
                format!("CPUutilization{}", i + 1),
                f64::from(cpu.cpu_usage()),
            ));
        }

        let load = System::load_average();
        metrics.push(Metric::gauge("LoadAverage1", load.one));
        metrics.push(Metric::gauge("LoadAverage5", load.five));
        metrics.push(Metric::gauge("LoadAverage15", load.fifteen));
        metrics.push(Metric::gauge("Uptime", System::uptime() as f64));

        self.sample_process(&mut metrics);

        metrics.push(Metric::gauge(RANDOM_VALUE, rand::thread_rng().gen::<f64>()));
        metrics.push(Metric::counter(POLL_COUNT, 1));
        metrics
    }

    fn sample_process(&mut self, metrics: &mut Vec<Metric>) {
        let Some(pid) = self.pid else {
            return;
        };

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::new()
                .with_cpu()
                .with_memory()
                .with_disk_usage(),
        );
        let Some(process) = self.system.process(pid) else {
            return;
        };

        let disk = process.disk_usage();
        let values = [
            process.memory() as f64,
            process.virtual_memory() as f64,
            f64::from(process.cpu_usage()),
            process.run_time() as f64,
            disk.total_read_bytes as f64,
            disk.total_written_bytes as f64,
        ];
        metrics.extend(
            PROCESS_GAUGES
                .iter()
                .zip(values)
                .map(|(name, value)| Metric::gauge(*name, value)),
        );
    }
}

impl Default for HostStats {
    fn default() -> Self {
        Self::new()
    }
}
