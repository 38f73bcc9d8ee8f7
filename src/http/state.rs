use crate::practice::PracticeSessionController;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single practice session this process drives
    pub controller: PracticeSessionController,
}

impl AppState {
    pub fn new(controller: PracticeSessionController) -> Self {
        Self { controller }
    }
}
