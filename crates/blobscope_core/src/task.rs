use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use uuid::Uuid;

pub type TaskId = Uuid;

/// Finished tasks kept around for the status view.
pub const MAX_FINISHED_TASKS: usize = 50;
const FINISHED_TASK_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    OpenCache,
    KeyScan,
    KeyGet,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::OpenCache => "Open Cache",
            TaskKind::KeyScan => "Key Scan",
            TaskKind::KeyGet => "Key Get",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

#[derive(Clone, Debug)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic sequence number attached to each asynchronous request.
///
/// Only the result carrying the latest generation may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every earlier one.
    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    pub fn current(&self) -> Generation {
        self.current
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current == generation
    }
}

/// Holds the single in-flight task of a component.
///
/// Starting a new task hands back the previous one so the caller can mark it
/// cancelled; finishing only succeeds for the task currently in the slot.
#[derive(Default)]
pub struct TaskSlot {
    active: Option<(TaskId, CancelToken)>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `id` in the slot. Returns the superseded task, if any, after
    /// cancelling its token.
    pub fn start(&mut self, id: TaskId, token: CancelToken) -> Option<TaskId> {
        let previous = self.active.replace((id, token));
        previous.map(|(old_id, old_token)| {
            old_token.cancel();
            old_id
        })
    }

    /// Clear the slot if it still holds `id`.
    pub fn take_if(&mut self, id: TaskId) -> Option<TaskId> {
        match &self.active {
            Some((active_id, _)) if *active_id == id => self.active.take().map(|(id, _)| id),
            _ => None,
        }
    }

    /// Cancel whatever is in the slot.
    pub fn cancel(&mut self) -> Option<TaskId> {
        self.active.take().map(|(id, token)| {
            token.cancel();
            id
        })
    }

}

pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub description: String,
    pub status: TaskStatus,
    pub started_at: Instant,
    pub completed_at: Option<Instant>,
    cancel_token: CancelToken,
}

impl Task {
    pub fn elapsed(&self) -> std::time::Duration {
        match self.completed_at {
            Some(completed) => completed.duration_since(self.started_at),
            None => self.started_at.elapsed(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub kind: TaskKind,
    pub description: String,
    pub status: TaskStatus,
    pub elapsed_secs: f64,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            kind: task.kind,
            description: task.description.clone(),
            status: task.status.clone(),
            elapsed_secs: task.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Default)]
pub struct TaskManager {
    tasks: HashMap<TaskId, Task>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    pub fn start(
        &mut self,
        kind: TaskKind,
        description: impl Into<String>,
    ) -> (TaskId, CancelToken) {
        let id = TaskId::new_v4();
        let cancel_token = CancelToken::new();

        let task = Task {
            id,
            kind,
            description: description.into(),
            status: TaskStatus::Running,
            started_at: Instant::now(),
            completed_at: None,
            cancel_token: cancel_token.clone(),
        };

        self.prune_finished();
        self.tasks.insert(id, task);
        (id, cancel_token)
    }

    pub fn complete(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.get_mut(&id)
            && task.status == TaskStatus::Running
        {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Instant::now());
        }
    }

    pub fn fail(&mut self, id: TaskId, error: impl Into<String>) {
        if let Some(task) = self.tasks.get_mut(&id)
            && task.status == TaskStatus::Running
        {
            task.status = TaskStatus::Failed(error.into());
            task.completed_at = Some(Instant::now());
        }
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(task) = self.tasks.get_mut(&id)
            && task.status == TaskStatus::Running
        {
            task.cancel_token.cancel();
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(Instant::now());
            return true;
        }
        false
    }

    pub fn recent_tasks(&self, limit: usize) -> Vec<TaskSnapshot> {
        let mut tasks: Vec<_> = self.tasks.values().collect();
        tasks.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        tasks
            .into_iter()
            .take(limit)
            .map(TaskSnapshot::from)
            .collect()
    }

    pub fn cleanup_completed(&mut self, max_age_secs: u64) {
        let now = Instant::now();
        self.tasks.retain(|_, task| {
            if task.status.is_terminal()
                && let Some(completed) = task.completed_at
            {
                return now.duration_since(completed).as_secs() < max_age_secs;
            }
            true
        });
    }

    /// Drop finished tasks that are too old, then the oldest finished ones
    /// beyond [`MAX_FINISHED_TASKS`]. Running tasks are always kept.
    fn prune_finished(&mut self) {
        self.cleanup_completed(FINISHED_TASK_TTL_SECS);

        let mut finished: Vec<(TaskId, Instant)> = self
            .tasks
            .values()
            .filter_map(|t| t.completed_at.map(|at| (t.id, at)))
            .collect();

        if finished.len() <= MAX_FINISHED_TASKS {
            return;
        }

        finished.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, _) in finished.into_iter().skip(MAX_FINISHED_TASKS) {
            self.tasks.remove(&id);
        }
    }

    pub fn current_status_message(&self) -> Option<String> {
        let running: Vec<_> = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Running)
            .collect();

        match running.len() {
            0 => None,
            1 => Some(running[0].description.clone()),
            n => Some(format!("{} tasks running...", n)),
        }
    }
}

/// Task registry shared between the browser components and the shell.
pub type SharedTasks = Arc<Mutex<TaskManager>>;

pub fn lock_tasks(tasks: &SharedTasks) -> MutexGuard<'_, TaskManager> {
    match tasks.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

/// Start a task for a component's slot, cancelling the task it replaces.
pub(crate) fn start_in_slot(
    tasks: &SharedTasks,
    slot: &mut TaskSlot,
    kind: TaskKind,
    description: impl Into<String>,
) -> (TaskId, CancelToken) {
    let mut manager = lock_tasks(tasks);
    let (task_id, cancel_token) = manager.start(kind, description);

    if let Some(old_id) = slot.start(task_id, cancel_token.clone()) {
        manager.cancel(old_id);
    }

    (task_id, cancel_token)
}

pub(crate) fn cancel_slot(tasks: &SharedTasks, slot: &mut TaskSlot) {
    if let Some(old_id) = slot.cancel() {
        lock_tasks(tasks).cancel(old_id);
    }
}
