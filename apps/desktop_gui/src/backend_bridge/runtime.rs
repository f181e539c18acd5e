//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{
    ClientSettings, DirectorySaveTarget, DownloadOutcome, FormController, HttpTransport,
};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::{commands::BackendCommand, view::ChannelFormView};
use crate::controller::events::UiEvent;

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: ClientSettings) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::BackendFailed(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        let transport = match HttpTransport::new(&settings.server_url) {
            Ok(transport) => transport,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::BackendFailed(format!(
                    "backend worker startup failure: invalid server url '{}': {err}",
                    settings.server_url
                )));
                tracing::error!(server_url = %settings.server_url, "invalid server url: {err}");
                return;
            }
        };
        let view = Arc::new(ChannelFormView::new(ui_tx.clone()));
        let controller = FormController::new(
            Arc::new(transport),
            view.clone(),
            Arc::new(DirectorySaveTarget::new(settings.download_dir.clone())),
        );

        runtime.block_on(async move {
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Ready; scraping via {}",
                settings.server_url
            )));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Submit { form } => {
                        tracing::info!(subreddit = %form.subreddit, "backend: submit");
                        view.replace_form(form);
                        let submission = controller.submit();
                        tokio::spawn(async move {
                            let outcome = submission.outcome().await;
                            tracing::info!(?outcome, "backend: scrape finished");
                        });
                    }
                    BackendCommand::Download { form } => {
                        tracing::info!("backend: download");
                        view.replace_form(form);
                        let controller = Arc::clone(&controller);
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            if let DownloadOutcome::Saved(path) = controller.download().await {
                                let _ = ui_tx.try_send(UiEvent::DownloadSaved(path));
                            }
                        });
                    }
                    BackendCommand::ToggleSentiment { checked } => {
                        view.set_include_sentiment(checked);
                        controller.toggle_sentiment(checked);
                    }
                    BackendCommand::Shutdown => break,
                }
            }

            controller.shutdown();
            tracing::info!("backend worker stopped");
        });
    });
}
