use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    load_settings, DirectorySaveTarget, DownloadOutcome, FormController, FormView, HttpTransport,
    SubmitOutcome,
};
use shared::{
    domain::{FormData, ScrapeForm, DEFAULT_MAX_POSTS},
    protocol::ProgressRender,
};

#[derive(Parser, Debug)]
struct Args {
    /// Overrides `server_url` from scrape_client.toml / APP__SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    client_id: String,
    #[arg(long)]
    client_secret: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    subreddit: String,
    #[arg(long, default_value_t = DEFAULT_MAX_POSTS)]
    max_posts: u32,
    #[arg(long)]
    include_sentiment: bool,
    /// Only honoured together with --include-sentiment.
    #[arg(long)]
    include_sentiment_score: bool,
    #[arg(long)]
    download_dir: Option<PathBuf>,
    /// Stop after the scrape completes instead of fetching the CSV.
    #[arg(long)]
    no_download: bool,
}

impl Args {
    fn form(&self) -> ScrapeForm {
        ScrapeForm {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            subreddit: self.subreddit.clone(),
            max_posts: self.max_posts,
            include_sentiment: self.include_sentiment,
            include_sentiment_score: self.include_sentiment_score,
        }
    }
}

/// Renders the form state on the terminal. The form itself is fixed by the
/// command line apart from the dependent score checkbox.
struct TerminalView {
    form: Mutex<ScrapeForm>,
}

impl TerminalView {
    fn new(form: ScrapeForm) -> Self {
        Self {
            form: Mutex::new(form),
        }
    }

    fn lock_form(&self) -> MutexGuard<'_, ScrapeForm> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FormView for TerminalView {
    fn form_snapshot(&self) -> FormData {
        self.lock_form().to_form_data()
    }

    fn set_progress_visible(&self, visible: bool) {
        tracing::debug!(visible, "progress bar visibility");
    }

    fn set_download_visible(&self, visible: bool) {
        tracing::debug!(visible, "download button visibility");
    }

    fn set_submit_enabled(&self, enabled: bool) {
        tracing::debug!(enabled, "submit button state");
    }

    fn set_sentiment_option_visible(&self, visible: bool) {
        tracing::debug!(visible, "sentiment score option visibility");
    }

    fn set_sentiment_score_checked(&self, checked: bool) {
        self.lock_form().include_sentiment_score = checked;
    }

    fn render_progress(&self, progress: ProgressRender) {
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "\rProgress: {:>4}", progress.label);
        let _ = stdout.flush();
    }

    fn set_status_text(&self, text: &str) {
        println!();
        println!("{text}");
    }

    fn alert(&self, message: &str) {
        eprintln!();
        eprintln!("{message}");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let settings = load_settings().context("failed to load scrape client settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let server_url = args.server_url.clone().unwrap_or(settings.server_url);
    let download_dir = args.download_dir.clone().unwrap_or(settings.download_dir);
    let transport = HttpTransport::new(&server_url)
        .with_context(|| format!("invalid server url {server_url}"))?;

    let form = args.form();
    let include_sentiment = form.include_sentiment;
    let view = Arc::new(TerminalView::new(form));
    let controller = FormController::new(
        Arc::new(transport),
        view,
        Arc::new(DirectorySaveTarget::new(download_dir)),
    );
    controller.toggle_sentiment(include_sentiment);

    let outcome = controller.submit().outcome().await;
    controller.shutdown();
    tracing::info!(?outcome, "scrape finished");

    match outcome {
        SubmitOutcome::Completed if args.no_download => Ok(ExitCode::SUCCESS),
        SubmitOutcome::Completed => match controller.download().await {
            DownloadOutcome::Saved(path) => {
                println!("Saved {}", path.display());
                Ok(ExitCode::SUCCESS)
            }
            DownloadOutcome::Failed => Ok(ExitCode::FAILURE),
        },
        SubmitOutcome::Failed(_) | SubmitOutcome::Cancelled => Ok(ExitCode::FAILURE),
    }
}
