//! Backend commands queued from UI to backend worker.

use shared::domain::ScrapeForm;

pub enum BackendCommand {
    /// Carries the form as it was when the button was pressed; the worker
    /// snapshots it for the controller.
    Submit {
        form: ScrapeForm,
    },
    Download {
        form: ScrapeForm,
    },
    ToggleSentiment {
        checked: bool,
    },
    Shutdown,
}
