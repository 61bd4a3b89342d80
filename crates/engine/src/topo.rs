// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-ordered concurrent task execution with critical-path
//! accounting (spec.md §4.2).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use svcinit_core::Label;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// One schedulable unit of work: a node in the dependency DAG the
/// [`TopoRunner`] drives to completion.
#[async_trait]
pub trait Task: Send + Sync {
    type Error: Send + Sync + 'static;

    fn key(&self) -> Label;

    /// Labels this task must wait on before it may run. The runner flips
    /// this relation itself in reversed mode; implementations always
    /// report the forward (dependency) direction.
    fn dependencies(&self) -> Vec<Label>;

    async fn run(&self, cancel: CancellationToken) -> Result<(), Self::Error>;

    fn start_time(&self) -> Option<Instant>;
    fn duration(&self) -> Option<Duration>;
}

/// Outcome of a single task once the runner finishes.
pub enum TaskOutcome<E> {
    Completed,
    Failed(Arc<E>),
    /// Not run because a prerequisite failed.
    Skipped { failed_dependency: Label },
    /// Not run because the cancellation token fired before it was released.
    Cancelled,
}

impl<E> TaskOutcome<E> {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

impl<E> Clone for TaskOutcome<E> {
    fn clone(&self) -> Self {
        match self {
            TaskOutcome::Completed => TaskOutcome::Completed,
            TaskOutcome::Failed(e) => TaskOutcome::Failed(Arc::clone(e)),
            TaskOutcome::Skipped { failed_dependency } => TaskOutcome::Skipped {
                failed_dependency: failed_dependency.clone(),
            },
            TaskOutcome::Cancelled => TaskOutcome::Cancelled,
        }
    }
}

/// Result of one [`TopoRunner::run`] invocation.
pub struct RunReport<E> {
    pub outcomes: IndexMap<Label, TaskOutcome<E>>,
    pub critical_path: Vec<(Label, Duration)>,
}

/// Executes a set of tasks honoring their dependency relation, forward or
/// reversed. Teardown uses reversed mode: a task runs only once
/// everything that depends on it has finished.
pub struct TopoRunner;

impl TopoRunner {
    pub async fn run<E>(
        tasks: Vec<Arc<dyn Task<Error = E>>>,
        reversed: bool,
        cancel: CancellationToken,
    ) -> Result<RunReport<E>, EngineError>
    where
        E: Send + Sync + 'static,
    {
        let n = tasks.len();
        if n == 0 {
            return Ok(RunReport { outcomes: IndexMap::new(), critical_path: Vec::new() });
        }

        let mut index_of: HashMap<Label, usize> = HashMap::with_capacity(n);
        for (i, task) in tasks.iter().enumerate() {
            index_of.insert(task.key(), i);
        }

        let mut prereqs: Vec<HashSet<usize>> = vec![HashSet::new(); n];
        if reversed {
            for (i, task) in tasks.iter().enumerate() {
                for dep in task.dependencies() {
                    if let Some(&dep_idx) = index_of.get(&dep) {
                        prereqs[dep_idx].insert(i);
                    }
                }
            }
        } else {
            for (i, task) in tasks.iter().enumerate() {
                for dep in task.dependencies() {
                    if let Some(&dep_idx) = index_of.get(&dep) {
                        prereqs[i].insert(dep_idx);
                    }
                }
            }
        }

        let topo_order = topological_order(&prereqs)
            .ok_or_else(|| EngineError::Cycle(tasks.iter().map(|t| t.key()).collect()))?;

        let mut senders = Vec::with_capacity(n);
        let mut receivers = Vec::with_capacity(n);
        for _ in 0..n {
            let (tx, rx) = tokio::sync::watch::channel::<Option<TaskOutcome<E>>>(None);
            senders.push(tx);
            receivers.push(rx);
        }

        let mut handles = Vec::with_capacity(n);
        for i in 0..n {
            let task = tasks[i].clone();
            let my_prereq_info: Vec<(Label, tokio::sync::watch::Receiver<Option<TaskOutcome<E>>>)> =
                prereqs[i].iter().map(|&p| (tasks[p].key(), receivers[p].clone())).collect();
            let sender = senders[i].clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let mut failed_dependency: Option<Label> = None;
                for (dep_label, mut recv) in my_prereq_info {
                    let settled = recv.wait_for(|v| v.is_some()).await.ok().and_then(|g| g.clone());
                    if let Some(outcome) = settled {
                        if !outcome.is_ok() && failed_dependency.is_none() {
                            failed_dependency = Some(dep_label);
                        }
                    }
                }

                let outcome = if let Some(dep) = failed_dependency {
                    TaskOutcome::Skipped { failed_dependency: dep }
                } else if cancel.is_cancelled() {
                    TaskOutcome::Cancelled
                } else {
                    match task.run(cancel.clone()).await {
                        Ok(()) => TaskOutcome::Completed,
                        Err(e) => TaskOutcome::Failed(Arc::new(e)),
                    }
                };
                let _ = sender.send(Some(outcome.clone()));
                (task.key(), outcome)
            }));
        }

        let mut outcomes = IndexMap::with_capacity(n);
        for handle in handles {
            if let Ok((key, outcome)) = handle.await {
                outcomes.insert(key, outcome);
            }
        }

        let critical_path = longest_path(&tasks, &prereqs, &topo_order);

        Ok(RunReport { outcomes, critical_path })
    }
}

fn topological_order(prereqs: &[HashSet<usize>]) -> Option<Vec<usize>> {
    let n = prereqs.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, preqs) in prereqs.iter().enumerate() {
        indegree[i] = preqs.len();
        for &p in preqs {
            dependents[p].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &d in &dependents[i] {
            indegree[d] -= 1;
            if indegree[d] == 0 {
                queue.push_back(d);
            }
        }
    }

    (order.len() == n).then_some(order)
}

/// Longest path by summed per-task duration over the same (possibly
/// reversed) relation the tasks ran under, tie-broken toward the
/// earliest-inserted predecessor.
fn longest_path<E>(
    tasks: &[Arc<dyn Task<Error = E>>],
    prereqs: &[HashSet<usize>],
    topo_order: &[usize],
) -> Vec<(Label, Duration)> {
    let n = tasks.len();
    let mut best = vec![Duration::ZERO; n];
    let mut pred: Vec<Option<usize>> = vec![None; n];

    for &i in topo_order {
        let weight = tasks[i].duration().unwrap_or(Duration::ZERO);
        let mut prereq_indices: Vec<usize> = prereqs[i].iter().copied().collect();
        prereq_indices.sort_unstable();

        let mut best_prereq = None;
        let mut best_prereq_value = Duration::ZERO;
        for p in prereq_indices {
            if best_prereq.is_none() || best[p] > best_prereq_value {
                best_prereq_value = best[p];
                best_prereq = Some(p);
            }
        }

        best[i] = weight + best_prereq_value;
        pred[i] = best_prereq;
    }

    if n == 0 {
        return Vec::new();
    }
    let mut end = 0usize;
    for i in 1..n {
        if best[i] > best[end] {
            end = i;
        }
    }

    let mut chain = Vec::new();
    let mut cur = Some(end);
    while let Some(i) = cur {
        chain.push((tasks[i].key(), tasks[i].duration().unwrap_or(Duration::ZERO)));
        cur = pred[i];
    }
    chain.reverse();
    chain
}

#[cfg(test)]
#[path = "topo_tests.rs"]
mod tests;
