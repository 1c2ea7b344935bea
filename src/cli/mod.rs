//! Command-line interface parsing and startup
//!
//! Parses the flags, installs the optional log file, resolves the server
//! address and hands a fully built [`App`] to the chat loop.

use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::models::fetch_models;
use crate::core::app::{App, ServerContext};
use crate::core::config::{resolve_host, Config};
use crate::core::constants::{HOST_ENV_VAR, LOG_FILE_ENV_VAR};
use crate::ui::chat_loop::run_chat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "ollama-tui")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A terminal chat interface for locally hosted Ollama models")]
#[command(
    long_about = "ollama-tui is a full-screen terminal chat interface for models served by \
a local Ollama instance. Responses stream in as they are generated, and files or whole \
directories can be attached as context for the next message.\n\n\
Environment Variables:\n\
  OLLAMA_HOST       Server address (defaults to http://localhost:11434)\n\
  OLLAMA_TUI_LOG    Write diagnostics to this file\n\
  RUST_LOG          Log filter used with OLLAMA_TUI_LOG (defaults to info)\n\n\
Controls:\n\
  Enter             Open the selected model / send the message\n\
  Alt+Enter         Insert a new line\n\
  Esc               Interrupt a streaming response\n\
  Ctrl+O            Attach a file or directory as context\n\
  Ctrl+X            Discard the attached context\n\
  Ctrl+L            Back to the model list\n\
  PgUp/PgDn         Scroll the conversation\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    /// Model server address, overriding OLLAMA_HOST and the config file
    #[arg(long, value_name = "ADDRESS")]
    pub host: Option<String>,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(args))
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    let Some(log_path) = std::env::var_os(LOG_FILE_ENV_VAR) else {
        return Ok(());
    };
    let log_file = open_log_file(Path::new(&log_path))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| e as Box<dyn Error>)?;
    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let env_host = std::env::var(HOST_ENV_VAR).ok();
    let base_url = resolve_host(args.host.as_deref(), env_host.as_deref(), &config);

    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .build()?;
    let browse_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    info!(host = %base_url, "Starting ollama-tui");
    let catalog_timeout = config.catalog_timeout();
    let startup = fetch_models(&client, &base_url, catalog_timeout).await;

    let server = ServerContext {
        client,
        base_url,
        catalog_timeout,
        browse_root,
    };
    run_chat(App::new(server, startup)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn host_flag_is_optional() {
        let args = Args::try_parse_from(["ollama-tui"]).expect("parse");
        assert!(args.host.is_none());

        let args = Args::try_parse_from(["ollama-tui", "--host", "http://gpu-box:11434"])
            .expect("parse");
        assert_eq!(args.host.as_deref(), Some("http://gpu-box:11434"));
    }

    #[test]
    fn subcommands_and_unknown_flags_are_rejected() {
        assert!(Args::try_parse_from(["ollama-tui", "chat"]).is_err());
        assert!(Args::try_parse_from(["ollama-tui", "--model", "llama3"]).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn log_file_is_appended_to() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ollama-tui.log");
        std::fs::write(&path, "existing\n").expect("seed");

        {
            use std::io::Write;
            let mut file = open_log_file(&path).expect("open");
            writeln!(file, "next").expect("write");
        }

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "existing\nnext\n");
    }
}
