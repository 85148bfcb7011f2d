//! Host driver
//!
//! [`Interpreter`] owns one run: the evaluator and the root future executing
//! the program. The future is polled with a no-op waker; each `Pending` is a
//! quantum boundary where the host may stop, inspect the cursor and the
//! scopes, or check for cancellation.
//!
//! # Outcomes
//!
//! - [`StepResult`] answers a single [`Interpreter::step`].
//! - [`RunOutcome`] answers [`Interpreter::run_tick`] and [`Interpreter::run`]:
//!   finished, paused at the end of a tick, waiting for console input,
//!   cancelled, or timed out. Faults are returned as `Err`.
//!
//! The timeout is wall-clock time since the first quantum, less the time the
//! run spent waiting for console input.

use crate::interpreter::errors::Result;
use crate::interpreter::evaluator::{Evaluator, Suspension};
use crate::parser::ast::{NodeInfo, Program};
use crate::runtime::Runtime;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

type Task = Pin<Box<dyn Future<Output = Result<i32>>>>;

/// Result of advancing one quantum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Running,
    AwaitingInput,
    Finished(i32),
}

/// Why a run returned control to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(i32),
    AwaitingInput,
    Cancelled,
    TimedOut,
    /// The tick's quantum budget ran out, or a breakpoint was reached
    Paused,
}

pub struct Interpreter {
    evaluator: Rc<Evaluator>,
    task: Option<Task>,
    source: String,
    finished: Option<Result<i32>>,
    /// Set by the first quantum
    started: Option<Instant>,
    /// Time spent in `AwaitingInput`, excluded from the timeout
    waiting: Duration,
    awaiting_since: Option<Instant>,
}

impl Interpreter {
    pub fn new(program: Program, source: impl Into<String>, runtime: Rc<Runtime>) -> Self {
        let evaluator = Rc::new(Evaluator::new(runtime));
        let ev = Rc::clone(&evaluator);
        let task: Task = Box::pin(async move { ev.run_program(&program).await });
        Interpreter {
            evaluator,
            task: Some(task),
            source: source.into(),
            finished: None,
            started: None,
            waiting: Duration::ZERO,
            awaiting_since: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Node most recently entered
    pub fn cursor(&self) -> Option<NodeInfo> {
        self.evaluator.cursor()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Exit status once the program has returned from `main`
    pub fn exit_code(&self) -> Option<i32> {
        match &self.finished {
            Some(Ok(code)) => Some(*code),
            _ => None,
        }
    }

    /// Advance exactly one quantum
    pub fn step(&mut self) -> Result<StepResult> {
        if let Some(finished) = &self.finished {
            return finished.clone().map(StepResult::Finished);
        }
        let Some(task) = self.task.as_mut() else {
            return Ok(StepResult::Running);
        };
        self.started.get_or_insert_with(Instant::now);
        if let Some(since) = self.awaiting_since.take() {
            self.waiting += since.elapsed();
        }
        let mut cx = Context::from_waker(Waker::noop());
        match task.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                self.task = None;
                match &result {
                    Ok(code) => tracing::debug!(code, "program finished"),
                    Err(error) => tracing::debug!(%error, "program faulted"),
                }
                self.finished = Some(result.clone());
                result.map(StepResult::Finished)
            }
            Poll::Pending => match self.evaluator.take_suspension() {
                Some(Suspension::AwaitingInput) => {
                    self.awaiting_since = Some(Instant::now());
                    Ok(StepResult::AwaitingInput)
                }
                _ => Ok(StepResult::Running),
            },
        }
    }

    /// Wall-clock time the run has been going, excluding input waits
    pub fn elapsed(&self) -> Duration {
        let Some(started) = self.started else {
            return Duration::ZERO;
        };
        let waiting = self.waiting + self.awaiting_since.map_or(Duration::ZERO, |since| since.elapsed());
        started.elapsed().saturating_sub(waiting)
    }

    fn timed_out(&self) -> bool {
        self.evaluator
            .config()
            .timeout
            .is_some_and(|limit| self.elapsed() > limit)
    }

    /// Run at most one tick's worth of quanta
    pub fn run_tick(&mut self, cancel: &dyn Fn() -> bool) -> Result<RunOutcome> {
        let quanta = self.evaluator.config().quanta_per_tick;
        for _ in 0..quanta {
            if cancel() {
                return Ok(RunOutcome::Cancelled);
            }
            if self.timed_out() {
                return Ok(RunOutcome::TimedOut);
            }
            match self.step()? {
                StepResult::Running => {}
                StepResult::AwaitingInput => return Ok(RunOutcome::AwaitingInput),
                StepResult::Finished(code) => return Ok(RunOutcome::Finished(code)),
            }
        }
        Ok(RunOutcome::Paused)
    }

    /// Run until the program finishes, waits for input, is cancelled or
    /// times out
    pub fn run(&mut self, cancel: &dyn Fn() -> bool) -> Result<RunOutcome> {
        loop {
            match self.run_tick(cancel)? {
                RunOutcome::Paused => continue,
                outcome => return Ok(outcome),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::runtime::config::Config;

    fn interpreter(source: &str, config: Config) -> Interpreter {
        let program = parse_source(source).unwrap();
        Interpreter::new(program, source, Runtime::new(config))
    }

    #[test]
    fn test_run_returns_exit_status() {
        let mut it = interpreter("int main() { return 3; }", Config::default());
        assert_eq!(it.run(&|| false).unwrap(), RunOutcome::Finished(3));
        assert_eq!(it.exit_code(), Some(3));
    }

    #[test]
    fn test_tick_budget_pauses() {
        let source = "int main() { int i = 0; while (i < 100) { i++; } return i; }";
        let mut it = interpreter(source, Config::default().with_quanta_per_tick(5));
        assert_eq!(it.run_tick(&|| false).unwrap(), RunOutcome::Paused);
        assert!(!it.is_finished());
        assert_eq!(it.run(&|| false).unwrap(), RunOutcome::Finished(100));
    }

    #[test]
    fn test_cancel_is_checked_per_quantum() {
        let mut it = interpreter("int main() { while (true) {} }", Config::default());
        assert_eq!(it.run(&|| true).unwrap(), RunOutcome::Cancelled);
    }

    #[test]
    fn test_timeout_stops_endless_loop() {
        let config = Config::default().with_timeout(Some(Duration::from_millis(20)));
        let mut it = interpreter("int main() { while (true) {} }", config);
        assert_eq!(it.run(&|| false).unwrap(), RunOutcome::TimedOut);
    }

    #[test]
    fn test_timeout_counts_time_between_ticks() {
        let config = Config::default()
            .with_timeout(Some(Duration::from_millis(50)))
            .with_quanta_per_tick(10);
        let mut it = interpreter("int main() { while (1) {} }", config);
        let mut outcome = it.run_tick(&|| false).unwrap();
        for _ in 0..200 {
            if outcome != RunOutcome::Paused {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
            outcome = it.run_tick(&|| false).unwrap();
        }
        assert_eq!(outcome, RunOutcome::TimedOut);
    }

    #[test]
    fn test_input_wait_does_not_count_toward_timeout() {
        use crate::runtime::config::BufferedConsole;
        let console = Rc::new(BufferedConsole::new());
        let config = Config::default()
            .with_timeout(Some(Duration::from_millis(200)))
            .with_console(console.clone());
        let source = "#include <cstdio>\nint main() { return getchar(); }";
        let mut it = interpreter(source, config);
        assert_eq!(it.run(&|| false).unwrap(), RunOutcome::AwaitingInput);
        std::thread::sleep(Duration::from_millis(300));
        assert!(it.elapsed() < Duration::from_millis(200));
        console.feed("x");
        assert_eq!(it.run(&|| false).unwrap(), RunOutcome::Finished(120));
    }

    #[test]
    fn test_fault_is_sticky() {
        let mut it = interpreter("int main() { return 1 / 0; }", Config::default());
        let first = it.run(&|| false).unwrap_err();
        let second = it.step().unwrap_err();
        assert_eq!(first, second);
    }
}
