use crate::engine::assets::region::Side;
use crate::engine::assets::texture_bank::TextureBank;
use crate::engine::scene::composer::{BaseMesh, OverlayMesh, PainMapScene};
use crate::engine::shaders::CompositeMaterial;
use crate::engine::snapshot::format::{MaterialRecord, NodeRecord, SceneSnapshot};
use crate::error::SnapshotError;
use crate::rpc::web_rpc::WebRpcInterface;
use bevy::asset::RenderAssetUsages;
use bevy::image::ImageSampler;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use std::collections::HashMap;
use std::path::Path;

/// Marks a scene root rebuilt from a file. Display only: it has no eraser target.
#[derive(Component)]
pub struct ImportedScene;

/// Parsed snapshot waiting for the viewer to leave loading.
#[derive(Resource, Default)]
pub struct PendingImport {
    queued: Option<(SceneSnapshot, String)>,
}

impl PendingImport {
    /// Parse and hold a snapshot. A bad file leaves any earlier queued import
    /// and the displayed scene untouched.
    pub fn queue_json(&mut self, json: &str, source: impl Into<String>) -> Result<(), SnapshotError> {
        let snapshot = SceneSnapshot::from_json(json)?;
        self.queued = Some((snapshot, source.into()));
        Ok(())
    }

    pub fn queue_file(&mut self, path: &Path) -> Result<(), SnapshotError> {
        let json = std::fs::read_to_string(path)?;
        self.queue_json(&json, path.display().to_string())
    }

    pub fn is_pending(&self) -> bool {
        self.queued.is_some()
    }
}

enum ImportedMaterial {
    Standard(Handle<StandardMaterial>),
    Overlay(Handle<CompositeMaterial>, Side),
}

/// Replace the displayed scene with the queued snapshot and adopt its ratings.
pub fn apply_pending_import(
    mut pending: ResMut<PendingImport>,
    mut commands: Commands,
    roots: Query<Entity, With<PainMapScene>>,
    bank: Option<Res<TextureBank>>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut images: ResMut<Assets<Image>>,
    mut standard_materials: ResMut<Assets<StandardMaterial>>,
    mut overlay_materials: ResMut<Assets<CompositeMaterial>>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    let Some((snapshot, source)) = pending.queued.take() else {
        return;
    };

    let geometries: HashMap<&str, Handle<Mesh>> = snapshot
        .geometries
        .iter()
        .map(|geometry| (geometry.id.as_str(), meshes.add(geometry.to_mesh())))
        .collect();

    // Erased strokes are not part of the file, so overlays start fully visible.
    let erase_mask = images.add(blank_erase_mask());

    let mut materials = HashMap::new();
    for record in &snapshot.materials {
        let imported = match record {
            MaterialRecord::Standard {
                base_colour,
                base_colour_texture,
                ..
            } => {
                let [r, g, b, a] = *base_colour;
                ImportedMaterial::Standard(standard_materials.add(StandardMaterial {
                    base_color: Color::linear_rgba(r, g, b, a),
                    base_color_texture: base_colour_texture
                        .as_ref()
                        .map(|path| asset_server.load(path.clone())),
                    ..default()
                }))
            }
            MaterialRecord::Overlay {
                side,
                base_colour,
                emissive,
                depth_bias,
                regions,
                ..
            } => {
                // Masks are matched by region key against the running bank;
                // the recorded paths are informational only.
                let set = bank.as_ref().and_then(|bank| bank.mask_set(*side));
                let keys: Vec<_> = set.map(|set| set.slot_keys().collect()).unwrap_or_default();
                for region in regions {
                    let slot = set.and_then(|set| {
                        set.slots.iter().find(|slot| slot.key.to_string() == region.key)
                    });
                    match (slot, &region.mask) {
                        (None, _) => warn!(
                            "Imported region '{}' has no loaded mask, drawn at zero",
                            region.key
                        ),
                        (Some(slot), Some(recorded)) if *recorded != slot.path => warn!(
                            "Imported region '{}' was recorded with mask '{}', using '{}'",
                            region.key, recorded, slot.path
                        ),
                        _ => {}
                    }
                }

                let mut material = CompositeMaterial::new(
                    *side,
                    erase_mask.clone(),
                    set.and_then(|set| set.layers.clone()),
                    keys,
                    &snapshot.state,
                    *depth_bias,
                );
                material.settings.base_colour = Vec4::from_array(*base_colour);
                material.settings.emissive = Vec4::from_array(*emissive);
                ImportedMaterial::Overlay(overlay_materials.add(material), *side)
            }
        };
        materials.insert(record.id(), imported);
    }

    for root in &roots {
        commands.entity(root).despawn();
    }

    let root = spawn_node(&mut commands, &snapshot.object, &geometries, &materials);
    commands.entity(root).insert((PainMapScene, ImportedScene));
    commands.insert_resource(snapshot.state.clone());

    info!(
        "✓ Snapshot imported from {}: {} nodes, {} geometries, {} materials",
        source,
        snapshot.object.count(),
        snapshot.geometries.len(),
        snapshot.materials.len()
    );
    rpc_interface.send_notification(
        "snapshot_imported",
        serde_json::json!({
            "source": source,
            "nodes": snapshot.object.count(),
            "state": snapshot.state
        }),
    );
}

fn spawn_node(
    commands: &mut Commands,
    node: &NodeRecord,
    geometries: &HashMap<&str, Handle<Mesh>>,
    materials: &HashMap<&str, ImportedMaterial>,
) -> Entity {
    let mut entity = commands.spawn((
        Name::new(node.name.clone()),
        node.transform(),
        Visibility::default(),
    ));

    if let Some(mesh) = node.geometry.as_deref().and_then(|id| geometries.get(id)) {
        entity.insert(Mesh3d(mesh.clone()));
    }
    match node.material.as_deref().and_then(|id| materials.get(id)) {
        Some(ImportedMaterial::Standard(handle)) => {
            entity.insert((MeshMaterial3d(handle.clone()), BaseMesh));
        }
        Some(ImportedMaterial::Overlay(handle, side)) => {
            entity.insert((MeshMaterial3d(handle.clone()), OverlayMesh { side: *side }));
        }
        None => {}
    }
    let parent = entity.id();

    for child in &node.children {
        let child = spawn_node(commands, child, geometries, materials);
        commands.entity(parent).add_child(child);
    }
    parent
}

/// 1x1 erase mask with nothing erased. Float textures only take a
/// non-filtering sampler.
fn blank_erase_mask() -> Image {
    let mut image = Image::new_fill(
        Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        bytemuck::cast_slice(&[0.0f32; 4]),
        TextureFormat::Rgba32Float,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    image.sampler = ImageSampler::nearest();
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::region::RegionKey;
    use crate::engine::assets::region_intensity::RegionIntensity;
    use crate::engine::snapshot::export::SceneReader;
    use crate::engine::snapshot::format::{GeometryRecord, RegionLayerRecord, SnapshotMetadata};
    use bevy::ecs::system::SystemState;

    fn snapshot_json(state: &RegionIntensity) -> String {
        let mut root = NodeRecord::new("PainMapScene", &Transform::from_xyz(0.0, -5.0, 0.0));
        let mut body = NodeRecord::new("FinalBaseMesh", &Transform::IDENTITY);
        body.geometry = Some("geometry_0".into());
        body.material = Some("material_0".into());
        let mut overlay = NodeRecord::new("FinalBaseMesh_overlay_right", &Transform::IDENTITY);
        overlay.geometry = Some("geometry_0".into());
        overlay.material = Some("material_1".into());
        root.children = vec![body, overlay];

        SceneSnapshot {
            metadata: SnapshotMetadata::default(),
            geometries: vec![GeometryRecord {
                id: "geometry_0".into(),
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: None,
                uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
                indices: None,
            }],
            materials: vec![
                MaterialRecord::Standard {
                    id: "material_0".into(),
                    base_colour: [0.8, 0.7, 0.6, 1.0],
                    base_colour_texture: None,
                },
                MaterialRecord::Overlay {
                    id: "material_1".into(),
                    side: Side::Right,
                    base_colour: [1.0, 0.2, 0.2, 1.0],
                    emissive: [0.3, 0.0, 0.0, 1.0],
                    depth_bias: 1.0,
                    regions: vec![RegionLayerRecord {
                        key: "Neck".into(),
                        mask: Some("textures/Final/Neck.png".into()),
                        opacity: 0.5,
                    }],
                },
            ],
            object: root,
            state: state.clone(),
        }
        .to_json()
        .unwrap()
    }

    fn import_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .init_asset::<Image>()
            .init_asset::<StandardMaterial>()
            .init_asset::<CompositeMaterial>()
            .init_resource::<PendingImport>()
            .init_resource::<WebRpcInterface>()
            .add_systems(Update, apply_pending_import);
        app
    }

    fn rated() -> RegionIntensity {
        let mut state = RegionIntensity::default();
        state.set(RegionKey::parse("Neck").unwrap(), 50).unwrap();
        state.set(RegionKey::parse("left_ThighToElbow").unwrap(), 100).unwrap();
        state
    }

    #[test]
    fn import_replaces_scene_and_adopts_ratings() {
        let mut app = import_app();
        let stale = app.world_mut().spawn((PainMapScene, Transform::default())).id();

        let state = rated();
        app.world_mut()
            .resource_mut::<PendingImport>()
            .queue_json(&snapshot_json(&state), "test")
            .unwrap();
        app.update();

        let world = app.world_mut();
        assert!(world.get_entity(stale).is_err());
        assert_eq!(world.query::<&PainMapScene>().iter(world).count(), 1);
        assert_eq!(world.query::<&ImportedScene>().iter(world).count(), 1);
        assert_eq!(world.query::<&OverlayMesh>().iter(world).count(), 1);
        assert_eq!(world.query::<&BaseMesh>().iter(world).count(), 1);
        assert_eq!(world.resource::<RegionIntensity>(), &state);
        assert!(!world.resource::<PendingImport>().is_pending());
    }

    #[test]
    fn malformed_import_keeps_current_scene() {
        let mut app = import_app();
        let current = app.world_mut().spawn((PainMapScene, Transform::default())).id();

        let result = app
            .world_mut()
            .resource_mut::<PendingImport>()
            .queue_json(r#"{"metadata": {}, "object": {}}"#, "test");
        app.update();

        assert!(matches!(result, Err(SnapshotError::MissingState)));
        assert!(app.world().get_entity(current).is_ok());
        assert!(!app.world().contains_resource::<RegionIntensity>());
    }

    #[test]
    fn reexport_of_import_keeps_ratings_and_tree() {
        let mut app = import_app();
        let state = rated();
        app.world_mut()
            .resource_mut::<PendingImport>()
            .queue_json(&snapshot_json(&state), "test")
            .unwrap();
        app.update();

        let mut reader: SystemState<SceneReader> = SystemState::new(app.world_mut());
        let exported = reader.get(app.world()).capture().unwrap();

        assert_eq!(exported.state, state);
        assert_eq!(exported.object.count(), 3);
        assert_eq!(exported.geometries.len(), 1);
        assert_eq!(exported.materials.len(), 2);
        assert_eq!(exported.object.translation, [0.0, -5.0, 0.0]);
    }

    #[test]
    fn imported_overlay_binds_the_running_mask_bank() {
        use crate::engine::assets::texture_bank::{MaskSlot, RegionMaskSet, SlotStatus};

        let mut app = import_app();
        let layers = app
            .world_mut()
            .resource_mut::<Assets<Image>>()
            .add(Image::default());
        let neck = RegionKey::parse("Neck").unwrap();
        let shoulder = RegionKey::parse("Shoulder").unwrap();
        let slot = |key: RegionKey, path: &str| MaskSlot {
            key,
            path: path.into(),
            channel: 0,
            handle: Handle::default(),
            status: SlotStatus::Ready,
        };
        app.world_mut().insert_resource(TextureBank {
            sets: vec![RegionMaskSet {
                side: Side::Right,
                // Recorded as textures/Final/Neck.png; the bank path wins.
                slots: vec![slot(neck, "masks/Neck.png"), slot(shoulder, "masks/Shoulder.png")],
                layers: Some(layers.clone()),
            }],
            ..default()
        });

        app.world_mut()
            .resource_mut::<PendingImport>()
            .queue_json(&snapshot_json(&rated()), "test")
            .unwrap();
        app.update();

        let world = app.world_mut();
        let handle = world
            .query::<&MeshMaterial3d<CompositeMaterial>>()
            .single(world)
            .unwrap()
            .0
            .clone();
        let materials = world.resource::<Assets<CompositeMaterial>>();
        let overlay = materials.get(&handle).unwrap();

        assert_eq!(overlay.region_layers, Some(layers));
        assert_eq!(overlay.slots, vec![neck, shoulder]);
        assert_eq!(overlay.settings.opacity(0), 0.5);
        assert_eq!(overlay.settings.opacity(1), 0.0);
        assert_eq!(overlay.settings.base_colour, Vec4::new(1.0, 0.2, 0.2, 1.0));
    }
}
