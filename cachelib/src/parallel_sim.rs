//! Runs many independent configurations over one shared trace
//!
//! Every configuration is a task in a fixed list. A pool of scoped worker threads pulls tasks in
//! order, each building its own cache, and all of them are joined before anything is returned.
//! Results are stored by task position, so they line up with the configurations however the
//! workers finish

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use serde::Serialize;
use thiserror::Error;
use crate::config::{CacheConfig, ConfigError, SimulationSuite};
use crate::simulator::{SimulationResult, Simulator};
use crate::trace::MemoryAccess;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("configuration {name} is invalid: {source}")]
    InvalidConfig { name: String, source: ConfigError },
    #[error("the worker simulating {0} panicked")]
    WorkerPanicked(String),
}

/// The outcome of one configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationResult {
    pub name: String,
    #[serde(flatten)]
    pub result: SimulationResult,
    #[serde(skip)]
    pub simulation_time: Duration,
    #[serde(skip)]
    pub uninitialised_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub name: String,
    pub caches: Vec<ConfigurationResult>,
}

/// Results for a whole suite, in the same groups and order as the suite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteResult {
    pub groups: Vec<GroupResult>,
}

impl SuiteResult {
    /// One line per group, each result written as `<hits>,<accesses>;`
    pub fn to_tuples(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            let row = group.caches.iter()
                .map(|c| c.result.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&row);
            out.push('\n');
        }
        out
    }
}

type TaskOutcome<R> = thread::Result<R>;

/// Runs `job` over every task on up to `workers` threads, returning the outcomes in task order
///
/// A task that panics produces an `Err` in its own position, the other tasks are unaffected
fn execute_pool<T, R, F>(tasks: &[T], workers: NonZeroUsize, job: F) -> Vec<TaskOutcome<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = workers.get().min(tasks.len());
    let next = AtomicUsize::new(0);
    let (sender, receiver) = mpsc::channel::<(usize, TaskOutcome<R>)>();
    let mut outcomes: Vec<Option<TaskOutcome<R>>> = (0..tasks.len()).map(|_| None).collect();
    thread::scope(|scope| {
        for _ in 0..workers {
            let sender = sender.clone();
            let (next, job) = (&next, &job);
            scope.spawn(move || loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(task) = tasks.get(index) else {
                    break;
                };
                let outcome = catch_unwind(AssertUnwindSafe(|| job(task)));
                if sender.send((index, outcome)).is_err() {
                    break;
                }
            });
        }
        // Only the workers hold senders now, so the receiver ends once they've all finished
        drop(sender);
        for (index, outcome) in receiver {
            outcomes[index] = Some(outcome);
        }
    });
    outcomes.into_iter()
        .map(|o| o.unwrap_or_else(|| Err(Box::new("task was never run") as Box<dyn Any + Send>)))
        .collect()
}

/// Simulates every configuration against the trace on a pool of `workers` threads
///
/// All configurations are validated before any worker starts. The trace is shared by reference,
/// each worker only owns the caches it builds
pub fn run_all(configs: &[CacheConfig], trace: &[MemoryAccess], workers: NonZeroUsize) -> Result<Vec<ConfigurationResult>, SimulationError> {
    for config in configs {
        config.validate().map_err(|source| SimulationError::InvalidConfig { name: config.name.clone(), source })?;
    }
    log::info!("Simulating {} configurations over {} accesses with {} workers", configs.len(), trace.len(), workers);
    let outcomes = execute_pool(configs, workers, |config| -> Result<ConfigurationResult, ConfigError> {
        let mut simulator = Simulator::new(config)?;
        let result = simulator.simulate(trace);
        log::debug!("{} finished in {:?}: {result}", config.name, simulator.get_execution_time());
        Ok(ConfigurationResult {
            name: config.name.clone(),
            result,
            simulation_time: *simulator.get_execution_time(),
            uninitialised_lines: simulator.get_uninitialised_line_count(),
        })
    });
    configs.iter()
        .zip(outcomes)
        .map(|(config, outcome)| match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(source)) => Err(SimulationError::InvalidConfig { name: config.name.clone(), source }),
            Err(_) => Err(SimulationError::WorkerPanicked(config.name.clone())),
        })
        .collect()
}

/// Runs every configuration of a suite, keeping the suite's grouping
pub fn run_suite(suite: &SimulationSuite, trace: &[MemoryAccess], workers: NonZeroUsize) -> Result<SuiteResult, SimulationError> {
    let configs: Vec<CacheConfig> = suite.configs().cloned().collect();
    let mut results = run_all(&configs, trace, workers)?.into_iter();
    let groups = suite.groups.iter()
        .map(|group| GroupResult {
            name: group.name.clone(),
            caches: results.by_ref().take(group.caches.len()).collect(),
        })
        .collect();
    Ok(SuiteResult { groups })
}
