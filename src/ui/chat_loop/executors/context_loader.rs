use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::app::{AppAction, AppActionContext, AppActionDispatcher, ContextRequestKind};
use crate::core::context::{load_directory, load_file, ContextBundle, ContextError};

pub fn load_context(path: &Path, kind: ContextRequestKind) -> Result<ContextBundle, ContextError> {
    match kind {
        ContextRequestKind::File => load_file(path),
        ContextRequestKind::Directory => load_directory(path),
    }
}

/// Read the context on the blocking pool so large trees never stall the UI.
pub fn spawn_context_loader(
    dispatcher: AppActionDispatcher,
    path: PathBuf,
    kind: ContextRequestKind,
    session_id: u64,
) {
    tokio::spawn(async move {
        let worker_path = path.clone();
        let result = tokio::task::spawn_blocking(move || load_context(&worker_path, kind))
            .await
            .unwrap_or_else(|join_err| {
                Err(ContextError::Read {
                    path: path.clone(),
                    source: io::Error::other(join_err.to_string()),
                })
            });
        if let Err(err) = &result {
            debug!(path = %path.display(), error = %err, "Context load failed");
        }
        dispatcher.dispatch_many(
            [AppAction::ContextLoaded { session_id, result }],
            AppActionContext::default(),
        );
    });
}
