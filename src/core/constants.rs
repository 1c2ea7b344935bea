//! Shared constants used across the application

/// Server address used when neither the flag, the environment nor the config
/// file names one.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Environment variable holding the server address.
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";

/// Environment variable pointing at a file that receives tracing output.
pub const LOG_FILE_ENV_VAR: &str = "OLLAMA_TUI_LOG";

/// Environment variable overriding the directory that holds `config.toml`.
pub const CONFIG_DIR_ENV_VAR: &str = "OLLAMA_TUI_CONFIG_DIR";

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Upper bound on a whole model list request. Chat streams are not bounded.
pub const DEFAULT_CATALOG_TIMEOUT_SECS: u64 = 10;

/// Directory names never descended into when loading directory context.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "venv",
    "env",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
];

/// File extensions (without the dot) skipped when loading directory context.
pub const IGNORED_EXTENSIONS: &[&str] = &["pyc", "pyo", "lock"];

/// Space reserved for the streaming indicator + margin in the input area.
pub const INDICATOR_SPACE: u16 = 4;
