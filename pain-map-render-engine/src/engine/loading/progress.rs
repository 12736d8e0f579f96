use bevy::prelude::*;

#[derive(Resource, Default)]
pub struct LoadingProgress {
    pub manifest_loaded: bool,
    pub model_resolved: bool,
    pub base_mask_loaded: bool,
    pub masks_configured: bool,
    /// (settled, total) region masks. Unsettled masks never block the viewer.
    pub region_masks: (usize, usize),
    /// Set when a required asset failed; the viewer stays in loading.
    pub blocked: Option<String>,
}

impl LoadingProgress {
    pub fn core_ready(&self) -> bool {
        self.manifest_loaded && self.model_resolved && self.masks_configured
    }

    pub fn block(&mut self, reason: String) {
        if self.blocked.is_none() {
            error!("Rendering blocked: {}", reason);
            self.blocked = Some(reason);
        }
    }
}
