use crate::constants::path::SNAPSHOT_FILE_NAME;
use crate::engine::assets::region::RegionKey;
use crate::engine::assets::region_intensity::RegionIntensity;
use crate::engine::assets::texture_bank::TextureBank;
use crate::engine::scene::composer::PainMapScene;
use crate::engine::shaders::CompositeMaterial;
use crate::engine::snapshot::format::{
    GeometryRecord, MaterialRecord, NodeRecord, RegionLayerRecord, SceneSnapshot,
    SnapshotMetadata,
};
use crate::error::SnapshotError;
use crate::rpc::web_rpc::WebRpcInterface;
use bevy::asset::UntypedAssetId;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum ExportDestination {
    File(PathBuf),
    /// Hand the JSON to the frontend, which owns the download.
    Frontend,
}

#[derive(Event, Debug, Clone)]
pub struct ExportSnapshotEvent {
    pub destination: ExportDestination,
}

type NodeComponents = (
    Option<&'static Name>,
    &'static Transform,
    Option<&'static Mesh3d>,
    Option<&'static MeshMaterial3d<StandardMaterial>>,
    Option<&'static MeshMaterial3d<CompositeMaterial>>,
    Option<&'static Children>,
);

/// Read-only view of the live scene graph, enough to serialise it.
#[derive(SystemParam)]
pub struct SceneReader<'w, 's> {
    roots: Query<'w, 's, Entity, With<PainMapScene>>,
    nodes: Query<'w, 's, NodeComponents>,
    meshes: Res<'w, Assets<Mesh>>,
    standard_materials: Res<'w, Assets<StandardMaterial>>,
    overlay_materials: Res<'w, Assets<CompositeMaterial>>,
    asset_server: Res<'w, AssetServer>,
    bank: Option<Res<'w, TextureBank>>,
    intensity: Option<Res<'w, RegionIntensity>>,
}

#[derive(Default)]
struct Catalogue {
    geometries: Vec<GeometryRecord>,
    materials: Vec<MaterialRecord>,
    geometry_ids: HashMap<AssetId<Mesh>, Option<String>>,
    material_ids: HashMap<UntypedAssetId, String>,
}

impl SceneReader<'_, '_> {
    /// Serialise the first scene root with the current ratings. `None` when
    /// there is no scene or no ratings yet.
    pub fn capture(&self) -> Option<SceneSnapshot> {
        let root = self.roots.iter().next()?;
        let state = self.intensity.as_deref()?.clone();

        let mut catalogue = Catalogue::default();
        let object = self.record_node(root, &mut catalogue)?;
        Some(SceneSnapshot {
            metadata: SnapshotMetadata::default(),
            geometries: catalogue.geometries,
            materials: catalogue.materials,
            object,
            state,
        })
    }

    fn record_node(&self, entity: Entity, catalogue: &mut Catalogue) -> Option<NodeRecord> {
        let (name, transform, mesh, standard, overlay, children) = self.nodes.get(entity).ok()?;
        let name = name.map_or_else(|| format!("node_{}", entity.index()), |n| n.to_string());
        let mut record = NodeRecord::new(name, transform);

        if let Some(mesh) = mesh {
            record.geometry = self.record_geometry(&mesh.0, catalogue);
        }
        if let Some(material) = standard {
            record.material = self.record_standard(&material.0, catalogue);
        } else if let Some(material) = overlay {
            record.material = self.record_overlay(&material.0, catalogue);
        }

        if let Some(children) = children {
            record.children = children
                .to_vec()
                .into_iter()
                .filter_map(|child| self.record_node(child, catalogue))
                .collect();
        }
        Some(record)
    }

    fn record_geometry(&self, handle: &Handle<Mesh>, catalogue: &mut Catalogue) -> Option<String> {
        if let Some(id) = catalogue.geometry_ids.get(&handle.id()) {
            return id.clone();
        }
        let id = format!("geometry_{}", catalogue.geometries.len());
        let record = self
            .meshes
            .get(handle)
            .and_then(|mesh| GeometryRecord::from_mesh(id, mesh));
        if record.is_none() {
            warn!("Skipping mesh without float positions in export");
        }
        let id = record.as_ref().map(|geometry| geometry.id.clone());
        catalogue.geometries.extend(record);
        catalogue.geometry_ids.insert(handle.id(), id.clone());
        id
    }

    fn record_standard(
        &self,
        handle: &Handle<StandardMaterial>,
        catalogue: &mut Catalogue,
    ) -> Option<String> {
        let key = handle.id().untyped();
        if let Some(id) = catalogue.material_ids.get(&key) {
            return Some(id.clone());
        }
        let material = self.standard_materials.get(handle)?;
        let id = format!("material_{}", catalogue.materials.len());
        catalogue.materials.push(MaterialRecord::Standard {
            id: id.clone(),
            base_colour: material.base_color.to_linear().to_f32_array(),
            base_colour_texture: material
                .base_color_texture
                .as_ref()
                .and_then(|texture| self.asset_server.get_path(texture))
                .map(|path| path.to_string()),
        });
        catalogue.material_ids.insert(key, id.clone());
        Some(id)
    }

    fn record_overlay(
        &self,
        handle: &Handle<CompositeMaterial>,
        catalogue: &mut Catalogue,
    ) -> Option<String> {
        let key = handle.id().untyped();
        if let Some(id) = catalogue.material_ids.get(&key) {
            return Some(id.clone());
        }
        let material = self.overlay_materials.get(handle)?;
        let state = self.intensity.as_deref().cloned().unwrap_or_default();
        let id = format!("material_{}", catalogue.materials.len());
        catalogue.materials.push(MaterialRecord::Overlay {
            id: id.clone(),
            side: material.side,
            base_colour: material.settings.base_colour.to_array(),
            emissive: material.settings.emissive.to_array(),
            depth_bias: material.depth_bias,
            regions: material
                .slots
                .iter()
                .map(|slot| RegionLayerRecord {
                    key: slot.to_string(),
                    mask: self.mask_path(*slot),
                    opacity: state.opacity(*slot),
                })
                .collect(),
        });
        catalogue.material_ids.insert(key, id.clone());
        Some(id)
    }

    fn mask_path(&self, key: RegionKey) -> Option<String> {
        let set = self.bank.as_ref()?.mask_set(key.side())?;
        set.slots
            .iter()
            .find(|slot| slot.key == key)
            .map(|slot| slot.path.clone())
    }
}

/// Ctrl+S writes `scene.json` to the working directory.
#[cfg(not(target_arch = "wasm32"))]
pub fn export_shortcut(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut export_events: EventWriter<ExportSnapshotEvent>,
) {
    let modifier = keyboard.any_pressed([
        KeyCode::ControlLeft,
        KeyCode::ControlRight,
        KeyCode::SuperLeft,
        KeyCode::SuperRight,
    ]);
    if modifier && keyboard.just_pressed(KeyCode::KeyS) {
        export_events.write(ExportSnapshotEvent {
            destination: ExportDestination::File(PathBuf::from(SNAPSHOT_FILE_NAME)),
        });
    }
}

pub fn export_snapshot_system(
    mut events: EventReader<ExportSnapshotEvent>,
    scene: SceneReader,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        let Some(snapshot) = scene.capture() else {
            warn!("Nothing to export: no scene or no ratings loaded");
            continue;
        };

        let result = match &event.destination {
            ExportDestination::File(path) => write_snapshot(&snapshot, path),
            ExportDestination::Frontend => serde_json::to_value(&snapshot)
                .map_err(SnapshotError::from)
                .map(|value| {
                    rpc_interface.send_notification(
                        "snapshot_exported",
                        serde_json::json!({
                            "file_name": SNAPSHOT_FILE_NAME,
                            "snapshot": value
                        }),
                    );
                }),
        };

        match result {
            Ok(()) => info!(
                "✓ Snapshot exported: {} nodes, {} geometries, {} materials",
                snapshot.object.count(),
                snapshot.geometries.len(),
                snapshot.materials.len()
            ),
            Err(err) => error!("Snapshot export failed: {}", err),
        }
    }
}

fn write_snapshot(snapshot: &SceneSnapshot, path: &Path) -> Result<(), SnapshotError> {
    std::fs::write(path, snapshot.to_json()?)?;
    info!("Snapshot written to {}", path.display());
    Ok(())
}
