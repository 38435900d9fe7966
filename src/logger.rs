use crate::config::{DEFAULT_LOG_FILTER, LOG_ENV};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Логирование с временными метками (диагностика для разработчика, не для пользователя)
pub fn init_logging() {
    let env = env_logger::Env::default().filter_or(LOG_ENV, DEFAULT_LOG_FILTER);
    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let now = chrono::Local::now();
            writeln!(
                buf,
                "RUST: [{}] {:<5} {}",
                now.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Success,
    Failure,
    Info,
    /// payload, который пользователь копирует другому пиру
    Relay,
}

/// Строка в окне вывода
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub text: String,
    /// Есть только у `Relay`
    pub payload: Option<String>,
    pub ts: i64,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LogKind::Success => write!(f, "Success: {}", self.text),
            LogKind::Failure => write!(f, "Failure: {}", self.text),
            LogKind::Info => write!(f, "{}", self.text),
            LogKind::Relay => match &self.payload {
                Some(payload) => write!(f, "{}\n{}", self.text, payload),
                None => write!(f, "{}", self.text),
            },
        }
    }
}

/// Куда попадают строки вывода: терминал, окно Tauri, память в тестах
pub trait EventSink: Send + Sync {
    fn append(&self, entry: LogEntry);
}

/// Окно вывода сессии; каждая строка дублируется в `log`
#[derive(Clone)]
pub struct OutputLog {
    sink: Arc<dyn EventSink>,
}

impl OutputLog {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn success(&self, msg: &str) {
        log::info!("success: {}", msg);
        self.push(LogKind::Success, msg.to_string(), None);
    }

    /// `op` это действие, которое не удалось, `cause` то, что ответила платформа
    pub fn failure(&self, op: &str, cause: impl fmt::Display) {
        let text = format!("{}, {}", op, cause);
        log::warn!("failure: {}", text);
        self.push(LogKind::Failure, text, None);
    }

    pub fn message(&self, msg: &str) {
        log::debug!("message: {}", msg);
        self.push(LogKind::Info, msg.to_string(), None);
    }

    pub fn relay(&self, msg: &str, payload: String) {
        log::debug!("relay: {} ({} chars)", msg, payload.len());
        self.push(LogKind::Relay, msg.to_string(), Some(payload));
    }

    fn push(&self, kind: LogKind, text: String, payload: Option<String>) {
        self.sink.append(LogEntry {
            kind,
            text,
            payload,
            ts: chrono::Utc::now().timestamp(),
        });
    }
}

/// Печать в stdout; relay-данные отдельной строкой, чтобы их было удобно копировать
pub struct TerminalSink;

impl EventSink for TerminalSink {
    fn append(&self, entry: LogEntry) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", entry);
        let _ = writeln!(out, "---");
    }
}

/// Накопитель строк (тесты, отладка)
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    pub fn of_kind(&self, kind: LogKind) -> Vec<LogEntry> {
        self.lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        // отравленный мьютекс не мешает читать накопленное
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for MemorySink {
    fn append(&self, entry: LogEntry) {
        self.lock().push(entry);
    }
}
