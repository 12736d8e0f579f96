use crate::engine::assets::region_intensity::RegionIntensity;
use crate::engine::loading::progress::LoadingProgress;
use crate::rpc::web_rpc::WebRpcInterface;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    /// Assets are ready but no ratings have arrived. The empty state is shown.
    AwaitingAssessment,
    Viewing,
}

pub fn transition_from_loading(
    loading_progress: Res<LoadingProgress>,
    intensity: Option<Res<RegionIntensity>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if !loading_progress.core_ready() {
        return;
    }

    if intensity.is_some() {
        info!("→ Core assets ready, transitioning to Viewing state");
        next_state.set(AppState::Viewing);
    } else {
        info!("→ Core assets ready, transitioning to AwaitingAssessment state");
        next_state.set(AppState::AwaitingAssessment);
    }
}

pub fn transition_to_viewing(
    intensity: Option<Res<RegionIntensity>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if intensity.is_some() {
        info!("→ Ratings received, transitioning to Viewing state");
        next_state.set(AppState::Viewing);
    }
}

/// Push load progress to the frontend whenever it moves.
pub fn update_loading_frontend(
    loading_progress: Res<LoadingProgress>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    if !loading_progress.is_changed() {
        return;
    }

    let (settled, total) = loading_progress.region_masks;
    rpc_interface.send_notification(
        "loading_progress",
        serde_json::json!({
            "manifest_loaded": loading_progress.manifest_loaded,
            "model_resolved": loading_progress.model_resolved,
            "base_mask_loaded": loading_progress.base_mask_loaded,
            "masks_configured": loading_progress.masks_configured,
            "region_masks": { "settled": settled, "total": total },
            "ready": loading_progress.core_ready(),
            "blocked": loading_progress.blocked
        }),
    );
}
