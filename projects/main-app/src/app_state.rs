use std::sync::Arc;

use crate::{
    camera::live_view::LiveView, config::AppConfig, core::state::DisplayBoard,
    sampler::busy::BusyFlag,
};

pub struct AppState {
    pub config: AppConfig,
    pub display: Arc<DisplayBoard>,
    pub live_view: LiveView,
    pub busy: BusyFlag,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        display: Arc<DisplayBoard>,
        live_view: LiveView,
        busy: BusyFlag,
    ) -> Self {
        Self {
            config,
            display,
            live_view,
            busy,
        }
    }
}
