//! Log record structure and the record-building seam

use super::callsite::CallSite;
use super::log_level::Level;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Default number of frames kept in a record's stack trace
pub const DEFAULT_STACK_DEPTH: usize = 5;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

fn process_name() -> &'static str {
    static PROCESS_NAME: OnceLock<String> = OnceLock::new();
    PROCESS_NAME.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "MainProcess".to_string())
    })
}

/// Payload of a record: free text or a structured value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Text(String),
    Structured(serde_json::Value),
}

impl Message {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Structured(_) => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(text) => f.write_str(text),
            Message::Structured(value) => write!(f, "{}", value),
        }
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<&String> for Message {
    fn from(s: &String) -> Self {
        Message::Text(s.clone())
    }
}

impl From<serde_json::Value> for Message {
    fn from(value: serde_json::Value) -> Self {
        Message::Structured(value)
    }
}

/// Immutable snapshot of one log event.
///
/// Handed across threads as `Arc<Record>`; there are no setters.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    logger_name: String,
    level: Level,
    timestamp: DateTime<Local>,
    utc_time: DateTime<Utc>,
    thread_id: String,
    thread_name: Option<String>,
    process_id: u32,
    process_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack_trace: Option<String>,
    file: String,
    pathname: &'static str,
    workdir: Option<String>,
    line: u32,
    function: Option<&'static str>,
    module: Option<&'static str>,
    message: Message,
}

impl Record {
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn level_name(&self) -> &str {
        self.level.name()
    }

    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    pub fn utc_time(&self) -> &DateTime<Utc> {
        &self.utc_time
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    pub fn process_name(&self) -> &str {
        self.process_name
    }

    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    /// Base name of the source file
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Source path as the compiler saw it
    pub fn pathname(&self) -> &str {
        self.pathname
    }

    pub fn workdir(&self) -> Option<&str> {
        self.workdir.as_deref()
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn function(&self) -> Option<&str> {
        self.function
    }

    pub fn module(&self) -> Option<&str> {
        self.module
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}

/// Builds a [`Record`] on the caller's thread.
///
/// Implementations must be cheap and must not touch dispatcher state: the
/// logger calls this before any hand-off so the call site stays the caller's.
pub trait RecordBuilder: Send + Sync {
    fn build(&self, logger_name: &str, level: Level, message: Message, site: CallSite) -> Record;
}

/// Populates every field from the current thread and process
#[derive(Debug, Clone)]
pub struct DefaultRecordBuilder {
    stack_depth: usize,
}

impl DefaultRecordBuilder {
    /// `stack_depth` of zero disables stack capture
    pub fn new(stack_depth: usize) -> Self {
        Self { stack_depth }
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_depth
    }

    // Captured regardless of RUST_BACKTRACE; a depth of zero costs nothing.
    fn capture_stack(&self) -> Option<String> {
        if self.stack_depth == 0 {
            return None;
        }
        let backtrace = Backtrace::force_capture();
        if backtrace.status() != BacktraceStatus::Captured {
            return None;
        }
        Some(caller_frames(&backtrace.to_string(), self.stack_depth))
    }
}

impl Default for DefaultRecordBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_DEPTH)
    }
}

impl RecordBuilder for DefaultRecordBuilder {
    fn build(&self, logger_name: &str, level: Level, message: Message, site: CallSite) -> Record {
        let utc_time = Utc::now();
        Record {
            logger_name: logger_name.to_string(),
            level,
            timestamp: utc_time.with_timezone(&Local),
            utc_time,
            thread_id: thread_id(),
            thread_name: thread_name(),
            process_id: std::process::id(),
            process_name: process_name(),
            stack_trace: self.capture_stack(),
            file: Path::new(site.file)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| site.file.to_string()),
            pathname: site.file,
            workdir: std::env::current_dir()
                .ok()
                .map(|dir| dir.to_string_lossy().into_owned()),
            line: site.line,
            function: site.function,
            module: site.module_path,
            message,
        }
    }
}

/// Symbol prefixes of the frames between the capture point and the caller
const INTERNAL_FRAMES: [&str; 5] = [
    "fuxlogger::",
    "<fuxlogger::",
    "std::backtrace",
    "<std::backtrace",
    "backtrace::",
];

fn frame_symbol(line: &str) -> Option<&str> {
    let (index, symbol) = line.trim_start().split_once(':')?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(symbol.trim())
}

/// Keep `depth` frames of a formatted backtrace, starting at the first frame
/// outside this crate and the capture machinery.
///
/// Frame headers look like `  12: symbol`; the `at file:line` lines that
/// follow a header belong to it.
fn caller_frames(formatted: &str, depth: usize) -> String {
    let mut frames: Vec<(&str, Vec<&str>)> = Vec::new();
    for line in formatted.lines() {
        match frame_symbol(line) {
            Some(symbol) => frames.push((symbol, vec![line])),
            None => {
                if let Some((_, lines)) = frames.last_mut() {
                    lines.push(line);
                }
            }
        }
    }
    frames
        .into_iter()
        .skip_while(|(symbol, _)| INTERNAL_FRAMES.iter().any(|prefix| symbol.starts_with(prefix)))
        .take(depth)
        .flat_map(|(_, lines)| lines)
        .collect::<Vec<_>>()
        .join("\n")
}
