//! Main TUI application state and logic

use crate::interpreter::debugger::IS_STATEMENT;
use crate::interpreter::errors::Result as RunResult;
use crate::interpreter::{Debugger, RunOutcome, StepResult};
use crate::runtime::config::BufferedConsole;
use crate::ui::panes::{self, RunBadge};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::rc::Rc;
use std::time::Duration;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Variables,
    Output,
}

impl FocusedPane {
    /// Move focus to the next pane (source -> output -> variables)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Variables,
            FocusedPane::Variables => FocusedPane::Source,
        }
    }
}

pub struct App {
    debugger: Debugger,
    /// Console the program reads from and writes to
    console: Rc<BufferedConsole>,

    focused_pane: FocusedPane,
    source_scroll: usize,
    variables_scroll: usize,
    output_scroll: usize,

    should_quit: bool,
    status_message: String,
    badge: RunBadge,
    /// Text typed while the program waits for input
    input: String,
}

impl App {
    pub fn new(debugger: Debugger, console: Rc<BufferedConsole>) -> Self {
        App {
            debugger,
            console,
            focused_pane: FocusedPane::Source,
            source_scroll: 0,
            variables_scroll: 0,
            output_scroll: 0,
            should_quit: false,
            status_message: String::from("Ready!"),
            badge: RunBadge::Ready,
            input: String::new(),
        }
    }

    /// Run the TUI event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Left column: source over output
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        let interpreter = self.debugger.interpreter();
        let cursor = interpreter.cursor();

        panes::render_source_pane(
            frame,
            left_rows[0],
            interpreter.source(),
            cursor.as_ref(),
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        let input = (self.badge == RunBadge::AwaitingInput).then_some(self.input.as_str());
        panes::render_output_pane(
            frame,
            left_rows[1],
            &self.console.output(),
            input,
            self.focused_pane == FocusedPane::Output,
            &mut self.output_scroll,
        );

        panes::render_variables_pane(
            frame,
            columns[1],
            &self.debugger.variables(),
            self.focused_pane == FocusedPane::Variables,
            &mut self.variables_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            cursor.as_ref(),
            self.badge,
            self.debugger.is_enabled(IS_STATEMENT),
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if self.badge == RunBadge::AwaitingInput {
            self.handle_input_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab => self.focused_pane = self.focused_pane.next(),
            KeyCode::Right => {
                let result = self.debugger.next_node().map(|step| match step {
                    StepResult::Running => RunOutcome::Paused,
                    StepResult::AwaitingInput => RunOutcome::AwaitingInput,
                    StepResult::Finished(code) => RunOutcome::Finished(code),
                });
                self.after_run("Stepped", result);
            }
            KeyCode::Char('n') => {
                let result = self.debugger.next_line();
                self.after_run("Next line", result);
            }
            KeyCode::Char('c') => {
                let result = self.debugger.continue_run(&|| false);
                self.after_run("Breakpoint", result);
            }
            KeyCode::Char('b') => {
                if self.debugger.is_enabled(IS_STATEMENT) {
                    self.debugger.disable_condition(IS_STATEMENT);
                    self.status_message = "Statement breakpoints off".to_string();
                } else {
                    self.debugger.enable_condition(IS_STATEMENT);
                    self.status_message = "Statement breakpoints on".to_string();
                }
            }
            KeyCode::Up => self.scroll(|offset| offset.saturating_sub(1)),
            KeyCode::Down => self.scroll(|offset| offset.saturating_add(1)),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let mut line = std::mem::take(&mut self.input);
                line.push('\n');
                self.console.feed(&line);
                self.badge = RunBadge::Ready;
                self.status_message = "Input sent".to_string();
            }
            KeyCode::Esc => {
                self.console.close_input();
                self.badge = RunBadge::Ready;
                self.status_message = "Input closed".to_string();
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn scroll(&mut self, f: impl Fn(usize) -> usize) {
        let offset = match self.focused_pane {
            FocusedPane::Source => &mut self.source_scroll,
            FocusedPane::Variables => &mut self.variables_scroll,
            FocusedPane::Output => &mut self.output_scroll,
        };
        *offset = f(*offset);
    }

    fn after_run(&mut self, label: &str, result: RunResult<RunOutcome>) {
        self.output_scroll = usize::MAX;
        match result {
            Ok(RunOutcome::Finished(code)) => {
                self.badge = RunBadge::Finished;
                self.status_message = format!("Program exited with status {}", code);
            }
            Ok(RunOutcome::AwaitingInput) => {
                self.badge = RunBadge::AwaitingInput;
                self.status_message = "Waiting for input".to_string();
            }
            Ok(RunOutcome::Cancelled | RunOutcome::TimedOut) => {
                self.status_message = "Stopped".to_string();
            }
            Ok(RunOutcome::Paused) => {
                self.status_message = match self.debugger.next_node_text() {
                    Some(text) => format!("{}: {}", label, first_line(&text)),
                    None => label.to_string(),
                };
            }
            Err(error) => {
                self.badge = RunBadge::Faulted;
                self.status_message = format!("Runtime error: {}", error);
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
