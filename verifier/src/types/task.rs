use std::path::PathBuf;

use chrono::{DateTime, SubsecRound, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::types::queue::{QueueMessage, QueueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskKind {
    Deployment,
    Verification,
}

/// Lifecycle of a task and of each per-file result.
/// `Processing` is never persisted, it only describes a task held by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Success,
    Error,
    Mismatch,
    Failed,
}

impl TaskStatus {
    /// Task level status, derived once every file has a result.
    /// Any successful file makes the task a success; mismatches and errors alone fail it.
    pub fn from_results(results: &[TaskResult]) -> TaskStatus {
        if results.iter().any(|r| r.status == TaskStatus::Success) {
            TaskStatus::Success
        } else {
            TaskStatus::Failed
        }
    }
}

/// Source language of a compiled file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    CameLigo,
    ReasonLigo,
    JsLigo,
    PascaLigo,
    Michelson,
    SmartPy,
}

/// Where the sources of a task came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskSource {
    Upload { files: Vec<String> },
    Repository { owner: String, repo: String, reference: String },
}

/// Per-file outcome of compiling (and for verification, comparing) one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Path relative to the task working directory.
    pub file: String,
    pub language: Option<Language>,
    pub script: Option<serde_json::Value>,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: String,
    pub artifact: Option<String>,
}

impl TaskResult {
    pub fn success(file: String, language: Language, script: serde_json::Value) -> Self {
        Self {
            file,
            language: Some(language),
            script: Some(script),
            status: TaskStatus::Success,
            error: String::new(),
            artifact: None,
        }
    }

    pub fn mismatch(file: String, language: Language, script: serde_json::Value) -> Self {
        Self {
            file,
            language: Some(language),
            script: Some(script),
            status: TaskStatus::Mismatch,
            error: String::new(),
            artifact: None,
        }
    }

    pub fn error(file: String, language: Option<Language>, error: impl Into<String>) -> Self {
        Self { file, language, script: None, status: TaskStatus::Error, error: error.into(), artifact: None }
    }
}

/// Durable record of submitted work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationTask {
    pub id: u64,
    pub user_id: Option<String>,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub address: Option<String>,
    pub network: Option<String>,
    pub source: Option<TaskSource>,
    #[serde(default)]
    pub results: Vec<TaskResult>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl CompilationTask {
    /// Artifact of the first successfully compiled file, if any.
    pub fn first_success_artifact(&self) -> Option<&str> {
        self.results.iter().find(|r| r.status == TaskStatus::Success).and_then(|r| r.artifact.as_deref())
    }
}

/// Everything needed to create a task; the store allocates the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub user_id: Option<String>,
    pub kind: TaskKind,
    pub address: Option<String>,
    pub network: Option<String>,
    pub source: Option<TaskSource>,
}

impl NewTask {
    pub fn into_task(self, id: u64) -> CompilationTask {
        let now = Utc::now().round_subsecs(0);
        CompilationTask {
            id,
            user_id: self.user_id,
            kind: self.kind,
            status: TaskStatus::Pending,
            address: self.address,
            network: self.network,
            source: self.source,
            results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Wire contract between the task producer and the compilation worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Kind")]
    pub kind: TaskKind,
    #[serde(rename = "Files")]
    pub files: Vec<PathBuf>,
    #[serde(rename = "Dir")]
    pub dir: PathBuf,
}

impl QueueMessage for TaskMessage {
    const QUEUE: QueueType = QueueType::Compilations;
}
