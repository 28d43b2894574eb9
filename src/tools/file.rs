//! File read/write/delete tool.
//!
//! All inputs cross a trust boundary (the model chooses the paths), so every
//! operation validates before touching the filesystem: non-empty path, no
//! parent-directory traversal, optional directory allow-list, extension
//! allow-list, and for writes a content size cap. Failures come back as a
//! structured [`FileOutcome`], never as an error.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::fs;
use tracing::{info, warn};

use crate::config::ToolsConfig;
use crate::tools::{ToolDefinition, ToolHandler};

/// Maximum content size for a single write (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

pub const DEFAULT_EXTENSIONS: [&str; 15] = [
    ".py", ".js", ".jsx", ".ts", ".tsx", ".html", ".css", ".scss", ".json", ".md", ".txt", ".yml",
    ".yaml", ".xml", ".rs",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub success: bool,
    pub file_path: String,
    pub bytes_written: usize,
    pub message: String,
}

impl FileOutcome {
    fn failure(file_path: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_path: file_path.to_string(),
            bytes_written: 0,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Write,
    Read,
    Delete,
}

impl FileOp {
    pub fn tool_name(self) -> &'static str {
        match self {
            FileOp::Write => "file_writer",
            FileOp::Read => "file_reader",
            FileOp::Delete => "file_deleter",
        }
    }
}

pub struct FileTool {
    allowed_dirs: Vec<PathBuf>,
    allowed_extensions: Vec<String>,
}

impl FileTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            allowed_dirs: config.allowed_dirs.clone(),
            allowed_extensions: if config.allowed_extensions.is_empty() {
                DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
            } else {
                config.allowed_extensions.clone()
            },
        }
    }

    fn is_path_allowed(&self, file_path: &str) -> bool {
        if self.allowed_dirs.is_empty() {
            return true;
        }
        let abs = std::path::absolute(file_path).unwrap_or_else(|_| PathBuf::from(file_path));
        self.allowed_dirs.iter().any(|dir| abs.starts_with(dir))
    }

    /// Runs the shared validation chain. Returns the rejection reason, if any.
    fn validate_path(&self, file_path: &str) -> Option<String> {
        if file_path.trim().is_empty() {
            return Some("File path must be a non-empty string".to_string());
        }
        if Path::new(file_path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Some("Path traversal is not allowed".to_string());
        }
        if !self.is_path_allowed(file_path) {
            return Some(format!(
                "File path is not in allowed directories: {:?}",
                self.allowed_dirs
            ));
        }
        if let Some(ext) = Path::new(file_path).extension().and_then(|e| e.to_str()) {
            let dotted = format!(".{}", ext);
            if !self.allowed_extensions.iter().any(|a| a == &dotted) {
                return Some(format!("File extension '{}' is not allowed", dotted));
            }
        }
        None
    }

    pub async fn write_file(
        &self,
        file_path: &str,
        content: &str,
        mode: &str,
        create_dirs: bool,
    ) -> FileOutcome {
        if let Some(reason) = self.validate_path(file_path) {
            return FileOutcome::failure(file_path, format!("Path validation failed: {}", reason));
        }
        if content.is_empty() {
            return FileOutcome::failure(file_path, "Invalid content: must be a non-empty string");
        }
        if content.len() > MAX_FILE_SIZE {
            return FileOutcome::failure(
                file_path,
                format!(
                    "Content too large: {} bytes exceeds limit of {}",
                    content.len(),
                    MAX_FILE_SIZE
                ),
            );
        }
        if mode != "w" && mode != "a" {
            return FileOutcome::failure(
                file_path,
                format!("Invalid mode: '{}'. Must be 'w' (write) or 'a' (append)", mode),
            );
        }

        if create_dirs
            && let Some(parent) = Path::new(file_path).parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            warn!("failed to create parent directories for {}: {}", file_path, e);
            return FileOutcome::failure(
                file_path,
                format!("Failed to create parent directories: {}", e),
            );
        }

        let result = if mode == "a" {
            use tokio::io::AsyncWriteExt;
            match fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .await
            {
                Ok(mut f) => f.write_all(content.as_bytes()).await,
                Err(e) => Err(e),
            }
        } else {
            fs::write(file_path, content).await
        };

        match result {
            Ok(()) => {
                let bytes_written = content.len();
                let action = if mode == "a" { "appended to" } else { "written to" };
                info!("file {} {} ({} bytes)", file_path, action, bytes_written);
                FileOutcome {
                    success: true,
                    file_path: file_path.to_string(),
                    bytes_written,
                    message: format!(
                        "Content {} file '{}' successfully ({} bytes)",
                        action, file_path, bytes_written
                    ),
                }
            }
            Err(e) => {
                warn!("write to {} failed: {}", file_path, e);
                FileOutcome::failure(file_path, format!("Error writing to file '{}': {}", file_path, e))
            }
        }
    }

    pub async fn read_file(&self, file_path: &str) -> FileOutcome {
        if let Some(reason) = self.validate_path(file_path) {
            return FileOutcome::failure(file_path, format!("Path validation failed: {}", reason));
        }

        let path = Path::new(file_path);
        match fs::metadata(path).await {
            Err(_) => {
                return FileOutcome::failure(file_path, format!("File not found: '{}'", file_path));
            }
            Ok(meta) if !meta.is_file() => {
                return FileOutcome::failure(
                    file_path,
                    format!("Path is not a file: '{}'", file_path),
                );
            }
            Ok(_) => {}
        }

        match fs::read_to_string(path).await {
            Ok(content) => {
                let bytes_read = content.len();
                info!("file {} read ({} bytes)", file_path, bytes_read);
                FileOutcome {
                    success: true,
                    file_path: file_path.to_string(),
                    bytes_written: bytes_read,
                    message: content,
                }
            }
            Err(e) => FileOutcome::failure(
                file_path,
                format!("Error reading file '{}': {}", file_path, e),
            ),
        }
    }

    pub async fn delete_file(&self, file_path: &str) -> FileOutcome {
        if let Some(reason) = self.validate_path(file_path) {
            return FileOutcome::failure(file_path, format!("Path validation failed: {}", reason));
        }

        if fs::metadata(file_path).await.is_err() {
            return FileOutcome::failure(file_path, format!("File not found: '{}'", file_path));
        }

        match fs::remove_file(file_path).await {
            Ok(()) => {
                info!("file {} deleted", file_path);
                FileOutcome {
                    success: true,
                    file_path: file_path.to_string(),
                    bytes_written: 0,
                    message: format!("File '{}' deleted successfully", file_path),
                }
            }
            Err(e) => FileOutcome::failure(
                file_path,
                format!("Error deleting file '{}': {}", file_path, e),
            ),
        }
    }
}

/// One registered dispatcher entry per file operation, all sharing a
/// [`FileTool`].
pub struct FileHandler {
    tool: std::sync::Arc<FileTool>,
    op: FileOp,
}

impl FileHandler {
    pub fn new(tool: std::sync::Arc<FileTool>, op: FileOp) -> Self {
        Self { tool, op }
    }
}

fn write_input_schema() -> Value {
    json!({
        "type": "object",
        "title": "FileWriteInput",
        "description": "Input parameters for file write operation",
        "properties": {
            "file_path": {
                "type": "string",
                "description": "The path to the file to write",
                "examples": ["./src/components/Header.tsx", "notes.md"]
            },
            "content": {
                "type": "string",
                "description": "The content to write to the file"
            },
            "mode": {
                "type": "string",
                "description": "Write mode: 'w' to overwrite (default), 'a' to append",
                "enum": ["w", "a"]
            },
            "create_dirs": {
                "type": "boolean",
                "description": "Create parent directories if they don't exist (default: true)"
            }
        },
        "required": ["file_path", "content"]
    })
}

fn path_input_schema() -> Value {
    json!({
        "type": "object",
        "title": "FilePathInput",
        "properties": {
            "file_path": {
                "type": "string",
                "description": "The path to the file",
                "examples": ["./src/components/Button.tsx"]
            }
        },
        "required": ["file_path"]
    })
}

fn output_schema() -> Value {
    json!({
        "type": "object",
        "title": "FileToolOutput",
        "properties": {
            "success": {"type": "boolean"},
            "file_path": {"type": "string"},
            "bytes_written": {"type": "integer"},
            "message": {"type": "string"}
        },
        "required": ["success", "file_path", "message"]
    })
}

#[async_trait]
impl ToolHandler for FileHandler {
    fn definition(&self) -> ToolDefinition {
        let (description, input_schema, examples) = match self.op {
            FileOp::Write => (
                "Write or append content to a file. Use 'mode' parameter: 'w' to overwrite, 'a' to append.",
                write_input_schema(),
                json!([{
                    "name": "Create a file",
                    "input": {"file_path": "./notes.md", "content": "# Notes\n", "mode": "w", "create_dirs": true},
                    "output": {"success": true, "file_path": "./notes.md", "bytes_written": 8, "message": "Content written to file './notes.md' successfully (8 bytes)"}
                }]),
            ),
            FileOp::Read => (
                "Read the entire content of a file. Provide the file path.",
                path_input_schema(),
                json!([{
                    "name": "Read a file",
                    "input": {"file_path": "./notes.md"},
                    "output": {"success": true, "file_path": "./notes.md", "bytes_written": 8, "message": "# Notes\n"}
                }]),
            ),
            FileOp::Delete => (
                "Delete a file permanently. Provide the file path.",
                path_input_schema(),
                json!([{
                    "name": "Delete a file",
                    "input": {"file_path": "./tmp.md"},
                    "output": {"success": true, "file_path": "./tmp.md", "bytes_written": 0, "message": "File './tmp.md' deleted successfully"}
                }]),
            ),
        };
        ToolDefinition {
            name: self.op.tool_name().to_string(),
            version: "1.0.0".to_string(),
            description: description.to_string(),
            category: "file_management".to_string(),
            input_schema,
            output_schema: output_schema(),
            examples,
        }
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Value {
        let Some(file_path) = args.get("file_path").and_then(Value::as_str) else {
            return serde_json::to_value(FileOutcome::failure(
                "unknown",
                "Invalid file path: must be a non-empty string",
            ))
            .unwrap_or_else(|_| json!({"error": "Invalid file path"}));
        };

        let outcome = match self.op {
            FileOp::Write => {
                let content = args.get("content").and_then(Value::as_str).unwrap_or("");
                let mode = args.get("mode").and_then(Value::as_str).unwrap_or("w");
                let create_dirs = args
                    .get("create_dirs")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                self.tool.write_file(file_path, content, mode, create_dirs).await
            }
            FileOp::Read => self.tool.read_file(file_path).await,
            FileOp::Delete => self.tool.delete_file(file_path).await,
        };

        serde_json::to_value(&outcome)
            .unwrap_or_else(|e| json!({"error": format!("Failed to serialize result: {}", e)}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn open_tool() -> FileTool {
        FileTool::new(&ToolsConfig::default())
    }

    fn restricted_tool(dir: &Path) -> FileTool {
        let config = ToolsConfig {
            allowed_dirs: vec![dir.to_path_buf()],
            ..ToolsConfig::default()
        };
        FileTool::new(&config)
    }

    #[tokio::test]
    async fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.md");
        let path = path.to_str().unwrap();
        let tool = open_tool();

        let out = tool.write_file(path, "# Title\n", "w", false).await;
        assert!(out.success, "{}", out.message);
        assert_eq!(out.bytes_written, 8);

        let read = tool.read_file(path).await;
        assert!(read.success);
        assert_eq!(read.message, "# Title\n");
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("a.txt");
        let tool = open_tool();

        let out = tool
            .write_file(path.to_str().unwrap(), "hi", "w", true)
            .await;
        assert!(out.success, "{}", out.message);
        assert_eq!(out.bytes_written, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi");
    }

    #[tokio::test]
    async fn append_mode_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        let path = path.to_str().unwrap();
        let tool = open_tool();

        tool.write_file(path, "# Title\n", "w", false).await;
        let out = tool.write_file(path, "## Section\n", "a", false).await;
        assert!(out.success);

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("# Title"));
        assert!(content.contains("## Section"));
    }

    #[tokio::test]
    async fn traversal_path_is_rejected() {
        let tool = open_tool();
        let out = tool.write_file("../../etc/passwd", "x", "w", false).await;
        assert!(!out.success);
        assert!(out.message.contains("traversal"));
    }

    #[tokio::test]
    async fn traversal_rejected_even_inside_allowed_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = restricted_tool(dir.path());
        let inside = dir.path().join("sub").join("..").join("x.txt");
        let out = tool
            .write_file(inside.to_str().unwrap(), "x", "w", false)
            .await;
        assert!(!out.success);
        assert!(out.message.contains("traversal"));
    }

    #[tokio::test]
    async fn path_outside_allowed_dirs_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = restricted_tool(dir.path());
        let out = tool.write_file("/tmp/elsewhere.txt", "x", "w", false).await;
        assert!(!out.success);
        assert!(out.message.contains("allowed directories"));
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected() {
        let tool = open_tool();
        let out = tool.write_file("payload.exe", "x", "w", false).await;
        assert!(!out.success);
        assert!(out.message.contains("extension"));
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let tool = open_tool();
        let out = tool.write_file("", "x", "w", false).await;
        assert!(!out.success);
        let out = tool.read_file("").await;
        assert!(!out.success);
        let out = tool.delete_file("").await;
        assert!(!out.success);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let tool = open_tool();
        let out = tool.write_file(path.to_str().unwrap(), "", "w", false).await;
        assert!(!out.success);
        assert!(out.message.contains("non-empty"));
    }

    #[tokio::test]
    async fn oversized_content_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let tool = open_tool();
        let content = "x".repeat(MAX_FILE_SIZE + 1);
        let out = tool
            .write_file(path.to_str().unwrap(), &content, "w", false)
            .await;
        assert!(!out.success);
        assert!(out.message.contains("too large"));
    }

    #[tokio::test]
    async fn invalid_mode_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let tool = open_tool();
        let out = tool
            .write_file(path.to_str().unwrap(), "x", "rb", false)
            .await;
        assert!(!out.success);
        assert!(out.message.contains("Invalid mode"));
    }

    #[tokio::test]
    async fn read_missing_file_is_structured_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let tool = open_tool();
        let out = tool.read_file(path.to_str().unwrap()).await;
        assert!(!out.success);
        assert!(out.message.contains("not found"));
    }

    #[tokio::test]
    async fn read_directory_is_structured_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = open_tool();
        let out = tool.read_file(dir.path().to_str().unwrap()).await;
        assert!(!out.success);
        assert!(out.message.contains("not a file"));
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmp.md");
        std::fs::write(&path, "bye").unwrap();
        let tool = open_tool();
        let out = tool.delete_file(path.to_str().unwrap()).await;
        assert!(out.success);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn delete_missing_file_is_structured_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghost.md");
        let tool = open_tool();
        let out = tool.delete_file(path.to_str().unwrap()).await;
        assert!(!out.success);
        assert!(out.message.contains("not found"));
    }

    #[tokio::test]
    async fn handler_invoke_writer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("a.txt");
        let handler = FileHandler::new(Arc::new(open_tool()), FileOp::Write);

        let mut args = Map::new();
        args.insert(
            "file_path".to_string(),
            Value::String(path.to_str().unwrap().to_string()),
        );
        args.insert("content".to_string(), Value::String("hi".to_string()));
        args.insert("create_dirs".to_string(), Value::Bool(true));

        let result = handler.invoke(&args).await;
        assert_eq!(result["success"], true);
        assert_eq!(result["bytes_written"], 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hi");
    }

    #[tokio::test]
    async fn handler_invoke_without_path_fails_gracefully() {
        let handler = FileHandler::new(Arc::new(open_tool()), FileOp::Read);
        let result = handler.invoke(&Map::new()).await;
        assert_eq!(result["success"], false);
    }

    #[test]
    fn definitions_carry_contract_fields() {
        let tool = Arc::new(open_tool());
        for op in [FileOp::Write, FileOp::Read, FileOp::Delete] {
            let def = FileHandler::new(tool.clone(), op).definition();
            assert_eq!(def.name, op.tool_name());
            assert_eq!(def.category, "file_management");
            assert!(def.input_schema["required"].is_array());
            assert!(def.output_schema["properties"]["success"].is_object());
            assert!(def.examples.is_array());
        }
    }
}
