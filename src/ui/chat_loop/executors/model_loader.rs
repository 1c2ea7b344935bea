use std::time::Duration;

use tracing::debug;

use crate::api::models::fetch_models;
use crate::core::app::{AppAction, AppActionContext, AppActionDispatcher};

pub fn spawn_model_loader(
    dispatcher: AppActionDispatcher,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
) {
    tokio::spawn(async move {
        let result = fetch_models(&client, &base_url, timeout).await;
        match &result {
            Ok(models) => debug!(count = models.len(), "Model list loaded"),
            Err(err) => debug!(error = %err, "Model list request failed"),
        }
        dispatcher.dispatch_many(
            [AppAction::ModelsLoaded { result }],
            AppActionContext::default(),
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::spawn_http_server;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn loaded_models_are_dispatched() {
        let body = r#"{"models":[{"name":"llama3","size":1}]}"#;
        let (base_url, _server) =
            spawn_http_server("HTTP/1.1 200 OK", "application/json", vec![body]).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_model_loader(
            AppActionDispatcher::new(tx),
            reqwest::Client::new(),
            base_url,
            Duration::from_secs(5),
        );

        let envelope = rx.recv().await.expect("action dispatched");
        match envelope.action {
            AppAction::ModelsLoaded { result: Ok(models) } => {
                assert_eq!(models.len(), 1);
                assert_eq!(models[0].name, "llama3");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }
}
