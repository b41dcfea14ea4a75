//! Scripted fakes of every collaborator, for tests that must not touch the OS.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use authscope_core::{
    AuthScopeError, AuthType, AuthorizationEvent, AuthorizationPoint, Control, DialogKind, Result,
};

use crate::catalog::Probe;
use crate::command::{CommandOutput, CommandRunner};
use crate::monitor::{EventMonitor, EventSource, LogEntry};
use crate::surface::SurfaceNavigator;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    Timeout,
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    arg: Option<String>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, program: &str, args: &[&str]) -> bool {
        let name = program.rsplit('/').next().unwrap_or(program);
        (program == self.program || name == self.program)
            && self
                .arg
                .as_deref()
                .map_or(true, |needle| args.iter().any(|a| a.contains(needle)))
    }
}

/// [`CommandRunner`] answering from a script.
///
/// Rules are tried in insertion order; put argument-specific rules first.
/// Programs are matched by full path or file name. Unscripted programs
/// fail to spawn.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Runner with no scripted programs
    pub fn new() -> Self {
        Self::default()
    }

    fn reply(mut self, program: &str, arg: Option<&str>, reply: Reply) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            arg: arg.map(str::to_string),
            reply,
        });
        self
    }

    /// `program` exits 0 printing `stdout`
    #[must_use]
    pub fn ok(self, program: &str, stdout: &str) -> Self {
        self.reply(program, None, Reply::Output(output(0, stdout, "")))
    }

    /// `program` exits 0 printing `stdout` when an argument contains `arg`
    #[must_use]
    pub fn ok_when(self, program: &str, arg: &str, stdout: &str) -> Self {
        self.reply(program, Some(arg), Reply::Output(output(0, stdout, "")))
    }

    /// `program` exits 1 printing `stderr`
    #[must_use]
    pub fn fail(self, program: &str, stderr: &str) -> Self {
        self.reply(program, None, Reply::Output(output(1, "", stderr)))
    }

    /// `program` exceeds its timeout
    #[must_use]
    pub fn timeout(self, program: &str) -> Self {
        self.reply(program, None, Reply::Timeout)
    }

    /// Every invocation so far, as `program arg arg...`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

fn output(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut call = program.to_string();
        for arg in args {
            call.push(' ');
            call.push_str(arg);
        }
        lock(&self.calls).push(call);

        match self.rules.iter().find(|r| r.matches(program, args)) {
            Some(Rule {
                reply: Reply::Output(out),
                ..
            }) => Ok(out.clone()),
            Some(Rule {
                reply: Reply::Timeout,
                ..
            }) => Err(AuthScopeError::CommandTimeout {
                program: program.to_string(),
                secs: crate::COMMAND_TIMEOUT.as_secs(),
            }),
            None => Err(AuthScopeError::CommandSpawn {
                program: program.to_string(),
                reason: "not scripted".to_string(),
            }),
        }
    }
}

/// [`EventSource`] replaying queued poll results, then returning nothing
#[derive(Debug, Default)]
pub struct QueuedSource {
    queue: Mutex<VecDeque<Result<Vec<LogEntry>>>>,
}

impl QueuedSource {
    /// Empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one successful poll
    pub fn push(&self, entries: Vec<LogEntry>) {
        lock(&self.queue).push_back(Ok(entries));
    }

    /// Queue one failing poll
    pub fn push_error(&self, message: &str) {
        lock(&self.queue).push_back(Err(AuthScopeError::EventSource(message.to_string())));
    }
}

#[async_trait]
impl EventSource for QueuedSource {
    async fn poll(&self, _slice: Duration) -> Result<Vec<LogEntry>> {
        lock(&self.queue).pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// [`SurfaceNavigator`] over an in-memory section tree.
///
/// Triggering a control can record events into an [`EventMonitor`] at
/// chosen offsets from the trigger time, standing in for the OS prompt.
#[derive(Debug, Default)]
pub struct FakeNavigator {
    sections: Vec<(String, Vec<Control>)>,
    open_error: Option<String>,
    list_error: bool,
    broken: HashSet<String>,
    effects: HashMap<String, Vec<(i64, String)>>,
    monitor: Option<EventMonitor>,
    trigger_delay: Duration,
    current: Mutex<String>,
    triggered: Mutex<Vec<String>>,
    dismissed: AtomicUsize,
}

impl FakeNavigator {
    /// Navigator with no sections
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section holding `(name, kind)` controls
    #[must_use]
    pub fn section(mut self, name: &str, controls: &[(&str, &str)]) -> Self {
        let controls = controls
            .iter()
            .map(|(control, kind)| Control::new(name, *control, *kind))
            .collect();
        self.sections.push((name.to_string(), controls));
        self
    }

    /// `open` fails as if the surface were unavailable
    #[must_use]
    pub fn failing_open(mut self, reason: &str) -> Self {
        self.open_error = Some(reason.to_string());
        self
    }

    /// `list_sections` fails
    #[must_use]
    pub fn failing_list(mut self) -> Self {
        self.list_error = true;
        self
    }

    /// Navigating to `section` fails
    #[must_use]
    pub fn broken(mut self, section: &str) -> Self {
        self.broken.insert(section.to_string());
        self
    }

    /// Triggering `path` records `right` at `offset_ms` after the trigger
    #[must_use]
    pub fn emits(mut self, path: &str, offset_ms: i64, right: &str) -> Self {
        self.effects
            .entry(path.to_string())
            .or_default()
            .push((offset_ms, right.to_string()));
        self
    }

    /// Monitor receiving triggered events
    #[must_use]
    pub fn with_monitor(mut self, monitor: EventMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Each trigger takes `delay`
    #[must_use]
    pub const fn with_trigger_delay(mut self, delay: Duration) -> Self {
        self.trigger_delay = delay;
        self
    }

    /// Paths triggered so far
    pub fn triggered(&self) -> Vec<String> {
        lock(&self.triggered).clone()
    }

    /// Number of dismissal calls
    pub fn dismiss_count(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurfaceNavigator for FakeNavigator {
    async fn open(&self) -> Result<()> {
        match &self.open_error {
            Some(reason) => Err(AuthScopeError::SurfaceUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    async fn list_sections(&self) -> Result<Vec<String>> {
        if self.list_error {
            return Err(AuthScopeError::SurfaceUnavailable("section list unavailable".into()));
        }
        Ok(self.sections.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn navigate(&self, section: &str) -> Result<()> {
        if self.broken.contains(section) {
            return Err(AuthScopeError::Navigation {
                section: section.to_string(),
                reason: "pane did not load".to_string(),
            });
        }
        *lock(&self.current) = section.to_string();
        Ok(())
    }

    async fn list_controls(&self) -> Result<Vec<Control>> {
        let current = lock(&self.current).clone();
        Ok(self
            .sections
            .iter()
            .find(|(name, _)| *name == current)
            .map(|(_, controls)| controls.clone())
            .unwrap_or_default())
    }

    async fn trigger(&self, control: &Control) -> Result<bool> {
        lock(&self.triggered).push(control.path.clone());
        let now = Utc::now();
        if let (Some(monitor), Some(effects)) = (&self.monitor, self.effects.get(&control.path)) {
            for (offset_ms, right) in effects {
                monitor.record(
                    AuthorizationEvent::new(right.as_str(), "", "fake surface")
                        .at(now + chrono::Duration::milliseconds(*offset_ms)),
                );
            }
        }
        if !self.trigger_delay.is_zero() {
            tokio::time::sleep(self.trigger_delay).await;
        }
        Ok(true)
    }

    async fn dismiss_dialog(&self) -> Result<DialogKind> {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
        Ok(DialogKind::None)
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Yield(Vec<AuthorizationPoint>),
    Fail,
    Panic,
    Sleep(Duration),
}

/// [`Probe`] with scripted behavior
#[derive(Debug, Clone)]
pub struct FakeProbe {
    name: String,
    behavior: Behavior,
}

impl FakeProbe {
    /// Probe returning `points`
    pub fn yielding(name: &str, points: Vec<AuthorizationPoint>) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Yield(points),
        }
    }

    /// Probe returning one admin point of `kind`
    pub fn admin(name: &str, kind: &str) -> Self {
        let point = AuthorizationPoint::new(kind, name, name, AuthType::Admin, "Requires an administrator", name);
        Self::yielding(name, vec![point])
    }

    /// Probe returning an error
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Fail,
        }
    }

    /// Probe that panics
    pub fn panicking(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Panic,
        }
    }

    /// Probe sleeping `delay`, then returning one admin point
    pub fn slow(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Sleep(delay),
        }
    }
}

#[async_trait]
impl Probe for FakeProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.name
    }

    async fn run(&self, _runner: &dyn CommandRunner) -> Result<Vec<AuthorizationPoint>> {
        match &self.behavior {
            Behavior::Yield(points) => Ok(points.clone()),
            Behavior::Fail => Err(AuthScopeError::Probe {
                probe: self.name.clone(),
                reason: "scripted failure".to_string(),
            }),
            Behavior::Panic => panic!("probe {} panicked", self.name),
            Behavior::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(vec![AuthorizationPoint::new(
                    "security",
                    self.name.as_str(),
                    self.name.as_str(),
                    AuthType::Admin,
                    "Requires an administrator",
                    self.name.as_str(),
                )])
            }
        }
    }
}
