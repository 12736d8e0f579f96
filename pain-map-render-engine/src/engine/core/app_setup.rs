use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;

use crate::engine::assets::editable_mask::refresh_editable_mask;
use crate::engine::assets::region_intensity::RegionIntensity;
use crate::engine::assets::region_manifest::RegionManifest;
use crate::engine::camera::orbit_camera::{OrbitCamera, camera_controller};
use crate::engine::core::app_state::{
    AppState, transition_from_loading, transition_to_viewing, update_loading_frontend,
};
use crate::engine::core::launch_options::LaunchOptions;
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::manifest_loader::{ManifestLoader, load_manifest_system, start_loading};
use crate::engine::loading::model_loader::resolve_base_model;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::loading::texture_config::configure_mask_textures;
use crate::engine::loading::texture_loader::{check_base_mask_loading, track_region_masks};
use crate::engine::scene::composer::{compose_scene, sync_overlay_intensity};
use crate::engine::scene::empty_state::{hide_empty_state, show_empty_state};
use crate::engine::scene::lighting::{follow_camera_light, spawn_lighting};
use crate::engine::shaders::CompositeMaterial;
use crate::engine::snapshot::export::{ExportSnapshotEvent, export_snapshot_system};
use crate::engine::snapshot::import::{PendingImport, apply_pending_import};
use crate::engine::systems::fps_tracking::fps_notification_system;
use crate::rpc::web_rpc::WebRpcPlugin;
use crate::tools::eraser::{
    EraserTool, eraser_pointer_system, eraser_radius_system, spawn_eraser_cursor,
};
use crate::tools::tool_manager::{
    ClearToolEvent, ToolManager, ToolSelectionEvent, handle_clear_tool_events,
    handle_tool_keyboard_shortcuts, handle_tool_selection_events,
};

#[cfg(not(target_arch = "wasm32"))]
use crate::engine::snapshot::export::export_shortcut;
#[cfg(not(target_arch = "wasm32"))]
use crate::engine::systems::fps_tracking::{fps_text_update_system, spawn_fps_overlay};
#[cfg(not(target_arch = "wasm32"))]
use crate::tools::tool_manager::clear_tool_on_escape;

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Registers RegionManifest as a loadable asset type from JSON files.
        .add_plugins(JsonAssetPlugin::<RegionManifest>::new(&["manifest.json"]))
        .add_plugins(MaterialPlugin::<CompositeMaterial>::default())
        .add_plugins(WebRpcPlugin);

    app.init_resource::<LoadingProgress>()
        .init_resource::<ManifestLoader>()
        .init_resource::<ToolManager>()
        .init_resource::<EraserTool>()
        .init_resource::<OrbitCamera>()
        .init_resource::<PendingImport>()
        .add_event::<ToolSelectionEvent>()
        .add_event::<ClearToolEvent>()
        .add_event::<ExportSnapshotEvent>();

    // Command line input lands before the first frame.
    LaunchOptions::from_env().apply(&mut app);

    app.add_systems(Startup, (setup, start_loading, spawn_eraser_cursor))
        .add_systems(
            Update,
            (
                load_manifest_system,
                resolve_base_model,
                check_base_mask_loading,
                configure_mask_textures,
                transition_from_loading,
            )
                .chain()
                .run_if(in_state(AppState::Loading)),
        )
        .add_systems(
            Update,
            transition_to_viewing.run_if(in_state(AppState::AwaitingAssessment)),
        )
        .add_systems(OnEnter(AppState::AwaitingAssessment), show_empty_state)
        .add_systems(OnExit(AppState::AwaitingAssessment), hide_empty_state)
        .add_systems(OnEnter(AppState::Viewing), compose_scene);

    // Region masks keep settling after the viewer opens.
    app.add_systems(
        Update,
        (
            track_region_masks,
            update_loading_frontend,
            apply_pending_import.run_if(
                not(in_state(AppState::Loading))
                    .and(|pending: Res<PendingImport>| pending.is_pending()),
            ),
        ),
    )
    .add_systems(PostUpdate, refresh_editable_mask);

    let runtime_systems = (
        camera_controller,
        follow_camera_light,
        // Tool management systems
        handle_tool_keyboard_shortcuts, // Native shortcuts or no-op for WASM
        handle_tool_selection_events,
        handle_clear_tool_events,
        (eraser_radius_system, eraser_pointer_system).chain(),
        sync_overlay_intensity.run_if(resource_exists_and_changed::<RegionIntensity>),
        export_snapshot_system,
        fps_notification_system,
    );

    app.add_systems(Update, runtime_systems.run_if(in_state(AppState::Viewing)));

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(Update, fps_text_update_system);
        app.add_systems(
            Update,
            (clear_tool_on_escape, export_shortcut).run_if(in_state(AppState::Viewing)),
        );
    }

    app
}

fn setup(mut commands: Commands, orbit: Res<OrbitCamera>) {
    info!("=== PAIN MAP VIEWER ===");

    commands.spawn((Camera3d::default(), orbit.transform()));
    spawn_lighting(&mut commands);

    #[cfg(not(target_arch = "wasm32"))]
    {
        spawn_fps_overlay(&mut commands);
    }
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
