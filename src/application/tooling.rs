use regex::{NoExpand, Regex};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {reason}")]
    Argument { tool: &'static str, reason: String },
    #[error("filesystem error on {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("command failed: {0}")]
    Command(String),
    #[error("failed to spawn command: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Fixed catalogue of local operations the model may request. The set is
/// established at startup and never changes for the process lifetime.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn builtin() -> Self {
        Self {
            specs: vec![
                ToolSpec {
                    name: "list_files",
                    description: "List the entries of the current working directory. Takes no arguments: {}.",
                },
                ToolSpec {
                    name: "read_file",
                    description: "Return the full contents of a file. Args: {\"path\": string}.",
                },
                ToolSpec {
                    name: "edit_file",
                    description: "Replace every match of the pattern oldStr with newStr inside an existing file. Args: {\"path\": string, \"oldStr\": string, \"newStr\": string}.",
                },
                ToolSpec {
                    name: "create_file",
                    description: "Write content to a file, creating missing parent directories and overwriting any existing file. Args: {\"path\": string, \"content\": string}.",
                },
                ToolSpec {
                    name: "exec",
                    description: "Run a shell command and return its standard output. Args: {\"command\": string}.",
                },
            ],
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// The single system instruction sent at startup: role statement, tool
    /// catalogue, and the strict JSON output contract.
    pub fn protocol_instruction(&self) -> String {
        let mut lines = vec![
            "You are a CLI coding agent working in the user's current directory.".to_string(),
            "When the user's request requires listing files, reading or creating files, editing file contents, or running a shell command, respond with only a JSON object of the form {\"tool\":\"tool_name\",\"args\":{...}} and no other text.".to_string(),
            "For every other request, reply with plain conversational text.".to_string(),
            "Available tools:".to_string(),
        ];
        for spec in &self.specs {
            lines.push(format!("- {}: {}", spec.name, spec.description));
        }
        lines.join("\n")
    }

    /// Runs the named tool against `args`. Argument validation happens
    /// before any I/O; handler failures come back as typed errors for the
    /// dispatch loop to record, never as panics.
    pub fn invoke(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        match name {
            "list_files" => list_files(),
            "read_file" => read_file(parse_args::<ReadFileArgs>("read_file", args)?),
            "edit_file" => edit_file(parse_args::<EditFileArgs>("edit_file", args)?),
            "create_file" => create_file(parse_args::<CreateFileArgs>("create_file", args)?),
            "exec" => exec(parse_args::<ExecArgs>("exec", args)?),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct EditFileArgs {
    path: String,
    #[serde(rename = "oldStr")]
    old_str: String,
    #[serde(rename = "newStr")]
    new_str: String,
}

#[derive(Debug, Deserialize)]
struct CreateFileArgs {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ExecArgs {
    command: String,
}

fn parse_args<T: DeserializeOwned>(tool: &'static str, args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|err| ToolError::Argument {
        tool,
        reason: err.to_string(),
    })
}

fn filesystem(path: &Path) -> impl FnOnce(io::Error) -> ToolError {
    let path = path.to_path_buf();
    move |source| ToolError::Filesystem { path, source }
}

fn list_files() -> Result<String, ToolError> {
    let cwd = Path::new(".");
    let mut entries = Vec::new();
    for entry in fs::read_dir(cwd).map_err(filesystem(cwd))? {
        let entry = entry.map_err(filesystem(cwd))?;
        entries.push(entry.file_name().to_string_lossy().into_owned());
    }
    entries.sort();
    debug!(count = entries.len(), "Listed working directory");
    Ok(entries.join("\n"))
}

fn read_file(args: ReadFileArgs) -> Result<String, ToolError> {
    let path = Path::new(&args.path);
    fs::read_to_string(path).map_err(filesystem(path))
}

fn edit_file(args: EditFileArgs) -> Result<String, ToolError> {
    // oldStr is a pattern, not literal text; it is compiled before the
    // file is touched.
    let pattern = Regex::new(&args.old_str).map_err(|err| ToolError::Argument {
        tool: "edit_file",
        reason: format!("invalid oldStr pattern: {err}"),
    })?;
    let path = Path::new(&args.path);
    let content = fs::read_to_string(path).map_err(filesystem(path))?;
    let replaced = pattern.replace_all(&content, NoExpand(args.new_str.as_str()));
    fs::write(path, replaced.as_bytes()).map_err(filesystem(path))?;
    Ok(format!("Updated {}", args.path))
}

fn create_file(args: CreateFileArgs) -> Result<String, ToolError> {
    let path = Path::new(&args.path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(filesystem(parent))?;
        }
    }
    fs::write(path, &args.content).map_err(filesystem(path))?;
    Ok(format!("Created {}", args.path))
}

// Unrestricted: whatever command the model names runs in a subshell with
// this process's own privileges.
fn exec(args: ExecArgs) -> Result<String, ToolError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(&args.command)
        .output()
        .map_err(|source| ToolError::Spawn { source })?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("command exited with {}", output.status)
        } else {
            stderr
        };
        Err(ToolError::Command(detail))
    }
}
