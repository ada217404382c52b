//! Command executor
//!
//! The executor owns every running command task and is the scheduler's
//! run-cycle: each tick it executes every running task, retires the finished
//! ones, and contains any task fault so one bad task cannot take down the
//! cycle or leave actuators driven.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};

// Internal
use super::{CmdState, Command};
use crate::sched::Cycle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Executor of command tasks.
///
/// Shared between the scheduler thread (which ticks it) and caller threads
/// (which start and cancel tasks) behind one mutex, so resource reclamation
/// and ticking are serialised: an interrupted incumbent has always fully
/// released its actuators before the next claimant initialises.
pub struct Executor {
    /// Tasks currently in the `Running` state
    running: Vec<Box<dyn Command>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Executor {
    /// Create a new executor with no running tasks.
    pub fn new() -> Self {
        Executor {
            running: Vec::new(),
        }
    }

    /// Start a task.
    ///
    /// Any running task holding one of the new task's resources is
    /// interrupted first - its `interrupted` cleanup completes before the
    /// new task's `initialize` begins. A fault in `initialize` retires the
    /// new task immediately through its `interrupted` cleanup.
    pub fn start(&mut self, mut cmd: Box<dyn Command>) {
        // Reclaim resources from any conflicting incumbent
        let mut i = 0;
        while i < self.running.len() {
            let conflict = self.running[i]
                .resources()
                .iter()
                .any(|r| cmd.resources().contains(r));

            if conflict {
                let mut incumbent = self.running.remove(i);
                warn!(
                    "Resource conflict: interrupting '{}' to start '{}'",
                    incumbent.name(),
                    cmd.name()
                );
                Self::guard(incumbent.as_mut(), "interrupted", |c| c.interrupted());
            } else {
                i += 1;
            }
        }

        debug!("Task '{}': {:?} -> {:?}", cmd.name(), CmdState::Constructed, CmdState::Running);

        match Self::guard(cmd.as_mut(), "initialize", |c| c.initialize()) {
            Some(()) => self.running.push(cmd),
            None => {
                // Faulted before it ever ran - force the interrupted cleanup
                // so its actuators are left safe, then discard it
                Self::guard(cmd.as_mut(), "interrupted", |c| c.interrupted());
            }
        }
    }

    /// Interrupt every running task, for example on leaving an active mode.
    pub fn cancel_all(&mut self) {
        for mut cmd in self.running.drain(..) {
            debug!("Task '{}': {:?} -> {:?}", cmd.name(), CmdState::Running, CmdState::Interrupted);
            Self::guard(cmd.as_mut(), "interrupted", |c| c.interrupted());
        }
    }

    /// Number of tasks currently running.
    pub fn num_running(&self) -> usize {
        self.running.len()
    }

    /// True if no task is running.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    /// Tick every running task once.
    fn tick_all(&mut self) {
        let mut i = 0;
        while i < self.running.len() {
            // Execute, containing any fault to this one task
            if Self::guard(self.running[i].as_mut(), "execute", |c| c.execute()).is_none() {
                self.retire_faulted(i);
                continue;
            }

            match Self::guard(self.running[i].as_mut(), "is_finished", |c| c.is_finished()) {
                Some(true) => {
                    let mut done = self.running.remove(i);
                    debug!(
                        "Task '{}': {:?} -> {:?}",
                        done.name(),
                        CmdState::Running,
                        CmdState::Finished
                    );
                    if Self::guard(done.as_mut(), "end", |c| c.end()).is_none() {
                        // A fault in end still owes the actuators a safe stop
                        Self::guard(done.as_mut(), "interrupted", |c| c.interrupted());
                    }
                }
                Some(false) => i += 1,
                None => self.retire_faulted(i),
            }
        }
    }

    /// Remove the task at `index` after a fault, forcing its interrupted
    /// cleanup.
    fn retire_faulted(&mut self, index: usize) {
        let mut faulted = self.running.remove(index);
        debug!(
            "Task '{}': {:?} -> {:?} (fault)",
            faulted.name(),
            CmdState::Running,
            CmdState::Interrupted
        );
        Self::guard(faulted.as_mut(), "interrupted", |c| c.interrupted());
    }

    /// Fault fence around a single task callback.
    ///
    /// Returns `None` if the callback panicked; the panic is logged and
    /// swallowed so the run-cycle continues with the other tasks.
    fn guard<R>(
        cmd: &mut dyn Command,
        phase: &str,
        f: impl FnOnce(&mut dyn Command) -> R,
    ) -> Option<R> {
        let name = cmd.name().to_owned();

        match catch_unwind(AssertUnwindSafe(move || f(cmd))) {
            Ok(r) => Some(r),
            Err(_) => {
                error!("Task fault: '{}' panicked during {}", name, phase);
                None
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Executor::new()
    }
}

impl Cycle for Executor {
    fn run_cycle(&mut self) {
        self.tick_all()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use parking_lot::Mutex;
    use std::sync::Arc;

    use super::*;
    use crate::cmd::Resource;

    /// Test command which records every lifecycle call into a shared log.
    struct TestCmd {
        name: &'static str,
        resources: Vec<Resource>,
        log: Arc<Mutex<Vec<String>>>,
        finish_after: Option<u32>,
        executes: u32,
        panic_in_execute: bool,
    }

    impl TestCmd {
        fn new(name: &'static str, resources: Vec<Resource>, log: Arc<Mutex<Vec<String>>>) -> Self {
            TestCmd {
                name,
                resources,
                log,
                finish_after: None,
                executes: 0,
                panic_in_execute: false,
            }
        }

        fn record(&self, event: &str) {
            self.log.lock().push(format!("{}:{}", self.name, event));
        }
    }

    impl Command for TestCmd {
        fn name(&self) -> &str {
            self.name
        }

        fn resources(&self) -> &[Resource] {
            &self.resources
        }

        fn initialize(&mut self) {
            self.record("initialize");
        }

        fn execute(&mut self) {
            if self.panic_in_execute {
                panic!("injected fault");
            }
            self.executes += 1;
            self.record("execute");
        }

        fn is_finished(&mut self) -> bool {
            matches!(self.finish_after, Some(n) if self.executes >= n)
        }

        fn end(&mut self) {
            self.record("end");
        }

        fn interrupted(&mut self) {
            self.record("interrupted");
        }
    }

    #[test]
    fn test_run_to_finish() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut exec = Executor::new();

        let mut cmd = TestCmd::new("a", vec![Resource::Drivetrain], log.clone());
        cmd.finish_after = Some(3);
        exec.start(Box::new(cmd));

        for _ in 0..5 {
            exec.run_cycle();
        }

        assert!(exec.is_idle());
        assert_eq!(
            *log.lock(),
            vec![
                "a:initialize",
                "a:execute",
                "a:execute",
                "a:execute",
                "a:end"
            ]
        );
    }

    #[test]
    fn test_resource_reclaim_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut exec = Executor::new();

        exec.start(Box::new(TestCmd::new(
            "a",
            vec![Resource::Drivetrain],
            log.clone(),
        )));
        exec.run_cycle();

        // Starting a conflicting task interrupts the incumbent exactly once,
        // before the new task initialises
        exec.start(Box::new(TestCmd::new(
            "b",
            vec![Resource::Drivetrain],
            log.clone(),
        )));

        let events = log.lock().clone();
        assert_eq!(
            events,
            vec!["a:initialize", "a:execute", "a:interrupted", "b:initialize"]
        );
        assert_eq!(exec.num_running(), 1);
    }

    #[test]
    fn test_disjoint_resources_coexist() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut exec = Executor::new();

        exec.start(Box::new(TestCmd::new(
            "drive",
            vec![Resource::Drivetrain],
            log.clone(),
        )));
        exec.start(Box::new(TestCmd::new(
            "climb",
            vec![Resource::Climber],
            log.clone(),
        )));

        assert_eq!(exec.num_running(), 2);

        exec.run_cycle();
        let events = log.lock().clone();
        assert!(events.contains(&"drive:execute".to_string()));
        assert!(events.contains(&"climb:execute".to_string()));
    }

    #[test]
    fn test_task_fault_contained() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut exec = Executor::new();

        let mut bad = TestCmd::new("bad", vec![Resource::Drivetrain], log.clone());
        bad.panic_in_execute = true;
        exec.start(Box::new(bad));
        exec.start(Box::new(TestCmd::new(
            "good",
            vec![Resource::Climber],
            log.clone(),
        )));

        exec.run_cycle();
        exec.run_cycle();

        let events = log.lock().clone();

        // The faulted task was forced to its interrupted cleanup, once
        assert_eq!(
            events.iter().filter(|e| *e == "bad:interrupted").count(),
            1
        );
        assert!(!events.contains(&"bad:execute".to_string()));

        // The other task kept ticking
        assert_eq!(events.iter().filter(|e| *e == "good:execute").count(), 2);
        assert_eq!(exec.num_running(), 1);
    }

    #[test]
    fn test_cancel_all() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut exec = Executor::new();

        exec.start(Box::new(TestCmd::new(
            "a",
            vec![Resource::Drivetrain],
            log.clone(),
        )));
        exec.start(Box::new(TestCmd::new(
            "b",
            vec![Resource::Climber],
            log.clone(),
        )));

        exec.cancel_all();

        assert!(exec.is_idle());
        let events = log.lock().clone();
        assert!(events.contains(&"a:interrupted".to_string()));
        assert!(events.contains(&"b:interrupted".to_string()));
    }
}
