use crate::engine::assets::editable_mask::EditableMask;
use crate::engine::assets::region::Side;
use crate::engine::assets::region_intensity::RegionIntensity;
use crate::engine::assets::region_manifest::RegionManifest;
use crate::engine::assets::texture_bank::TextureBank;
use crate::engine::loading::model_loader::ResolvedModel;
use crate::engine::shaders::CompositeMaterial;
use crate::tools::eraser::EraserTarget;
use bevy::prelude::*;
use constants::render_settings::MODEL_VERTICAL_OFFSET;

/// Root of the displayed body, composed or imported.
#[derive(Component)]
pub struct PainMapScene;

#[derive(Component)]
pub struct BaseMesh;

#[derive(Component, Debug, Clone, Copy)]
pub struct OverlayMesh {
    pub side: Side,
}

/// Translation that puts the box centre at the origin, then drops it by the
/// fixed vertical offset.
pub fn centring_offset(min: Vec3, max: Vec3) -> Vec3 {
    -(min + max) * 0.5 + Vec3::Y * MODEL_VERTICAL_OFFSET
}

/// Mesh-space bounding box.
pub fn mesh_bounds(mesh: &Mesh) -> Option<(Vec3, Vec3)> {
    let aabb = mesh.compute_aabb()?;
    Some((aabb.min().into(), aabb.max().into()))
}

/// Bounding box of `(min, max)` after `transform`, from its eight corners.
pub fn transformed_bounds(min: Vec3, max: Vec3, transform: &Transform) -> (Vec3, Vec3) {
    let corners = (0..8).map(|i| {
        Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        )
    });
    corners
        .map(|corner| transform.transform_point(corner))
        .fold((Vec3::INFINITY, Vec3::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p), hi.max(p))
        })
}

/// Assemble base mesh and one overlay per configured side under a centred root.
///
/// Does nothing if a scene is already present, which is the case after an
/// import landed before the viewer opened.
pub fn compose_scene(
    mut commands: Commands,
    existing: Query<(), With<PainMapScene>>,
    model: Option<Res<ResolvedModel>>,
    manifest: Option<Res<RegionManifest>>,
    bank: Option<Res<TextureBank>>,
    mask: Option<Res<EditableMask>>,
    intensity: Option<Res<RegionIntensity>>,
    meshes: Res<Assets<Mesh>>,
    mut standard_materials: ResMut<Assets<StandardMaterial>>,
    mut overlay_materials: ResMut<Assets<CompositeMaterial>>,
) {
    if !existing.is_empty() {
        info!("Scene already present, skipping composition");
        return;
    }
    let (Some(model), Some(manifest), Some(bank), Some(mask)) = (model, manifest, bank, mask)
    else {
        warn!("Scene composition requested before core assets were ready");
        return;
    };
    let intensity = intensity.map(|res| res.clone()).unwrap_or_default();

    let Some((local_min, local_max)) = meshes.get(&model.mesh).and_then(mesh_bounds) else {
        warn!("Base mesh '{}' has no positions, nothing to display", model.name);
        return;
    };
    let (min, max) = transformed_bounds(local_min, local_max, &model.transform);
    let offset = centring_offset(min, max);

    let base_material = model
        .material
        .clone()
        .unwrap_or_else(|| standard_materials.add(StandardMaterial::default()));

    let mut root = commands.spawn((
        PainMapScene,
        Name::new("PainMapScene"),
        Transform::from_translation(offset),
        Visibility::default(),
    ));

    root.with_children(|parent| {
        parent.spawn((
            BaseMesh,
            Name::new(model.name.clone()),
            Mesh3d(model.mesh.clone()),
            MeshMaterial3d(base_material),
            model.transform,
        ));

        for config in &manifest.sides {
            let Some(set) = bank.mask_set(config.side) else {
                warn!("No mask set for the {} side", config.side.as_str());
                continue;
            };
            let material = overlay_materials.add(CompositeMaterial::new(
                config.side,
                mask.handle().clone(),
                set.layers.clone(),
                set.slot_keys().collect(),
                &intensity,
                config.depth_bias,
            ));

            let overlay = (
                OverlayMesh { side: config.side },
                Name::new(format!("{}_overlay_{}", model.name, config.side.as_str())),
                Mesh3d(model.mesh.clone()),
                MeshMaterial3d(material),
                model.transform,
            );
            let target = EraserTarget {
                bounds_min: local_min,
                bounds_max: local_max,
            };

            if config.mirrored {
                parent
                    .spawn((
                        Name::new(format!("mirror_{}", config.side.as_str())),
                        Transform::from_scale(Vec3::new(-1.0, 1.0, 1.0)),
                        Visibility::default(),
                    ))
                    .with_children(|mirror| {
                        let mut entity = mirror.spawn(overlay);
                        if config.erasable {
                            entity.insert(target);
                        }
                    });
            } else {
                let mut entity = parent.spawn(overlay);
                if config.erasable {
                    entity.insert(target);
                }
            }
        }
    });

    info!(
        "✓ Scene composed: {} overlay sides, centred with offset {:?}",
        manifest.sides.len(),
        offset
    );
}

/// Push rating changes into every overlay's opacity uniform.
pub fn sync_overlay_intensity(
    intensity: Res<RegionIntensity>,
    overlays: Query<&MeshMaterial3d<CompositeMaterial>, With<OverlayMesh>>,
    mut materials: ResMut<Assets<CompositeMaterial>>,
) {
    for handle in &overlays {
        if let Some(material) = materials.get_mut(&handle.0) {
            material.refresh_opacities(&intensity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::region::RegionKey;
    use crate::engine::assets::region_manifest::SideConfig;
    use crate::engine::assets::texture_bank::{MaskSlot, RegionMaskSet, SlotStatus};
    use bevy::asset::RenderAssetUsages;
    use bevy::render::mesh::{Indices, PrimitiveTopology};

    fn box_mesh(min: Vec3, max: Vec3) -> Mesh {
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::MAIN_WORLD)
            .with_inserted_attribute(
                Mesh::ATTRIBUTE_POSITION,
                vec![min.to_array(), [max.x, min.y, min.z], max.to_array()],
            )
            .with_inserted_indices(Indices::U32(vec![0, 1, 2]))
    }

    fn side(side: Side, erasable: bool) -> SideConfig {
        SideConfig {
            side,
            mirrored: side == Side::Left,
            erasable,
            depth_bias: 1.0,
        }
    }

    fn scene_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Mesh>()
            .init_asset::<Image>()
            .init_asset::<StandardMaterial>()
            .init_asset::<CompositeMaterial>()
            .add_systems(Update, compose_scene);

        let mesh = app
            .world_mut()
            .resource_mut::<Assets<Mesh>>()
            .add(box_mesh(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 10.0, 1.0)));
        let mask = EditableMask::from_bytes(2, 2, &[0; 16], 4, 1).unwrap();

        app.insert_resource(ResolvedModel {
            name: "FinalBaseMesh".into(),
            mesh,
            material: None,
            transform: Transform::IDENTITY,
        })
        .insert_resource(RegionManifest {
            model: "model.glb".into(),
            target_mesh: "FinalBaseMesh".into(),
            base_mask: "base.png".into(),
            erase_channel: 1,
            sides: vec![side(Side::Right, true), side(Side::Left, false)],
            masks: Vec::new(),
        })
        .insert_resource(TextureBank {
            sets: [Side::Right, Side::Left]
                .into_iter()
                .map(|side| RegionMaskSet {
                    side,
                    slots: vec![MaskSlot {
                        key: RegionKey::new("Neck", side).unwrap(),
                        path: "neck.png".into(),
                        channel: 1,
                        handle: Handle::default(),
                        status: SlotStatus::Ready,
                    }],
                    layers: Some(Handle::default()),
                })
                .collect(),
            ..default()
        })
        .insert_resource(mask);
        app
    }

    #[test]
    fn centring_moves_box_centre_below_origin() {
        let offset = centring_offset(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(offset, Vec3::new(0.0, -10.0, 0.0));
    }

    #[test]
    fn transformed_bounds_follow_scale_and_translation() {
        let transform = Transform::from_xyz(0.0, 1.0, 0.0).with_scale(Vec3::new(-2.0, 1.0, 1.0));
        let (min, max) = transformed_bounds(Vec3::ZERO, Vec3::ONE, &transform);

        assert_eq!(min, Vec3::new(-2.0, 1.0, 0.0));
        assert_eq!(max, Vec3::new(0.0, 2.0, 1.0));
    }

    #[test]
    fn composes_one_overlay_per_side_with_one_eraser_target() {
        let mut app = scene_app();
        app.update();

        let world = app.world_mut();
        let roots: Vec<Transform> = world
            .query_filtered::<&Transform, With<PainMapScene>>()
            .iter(world)
            .copied()
            .collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].translation, Vec3::new(0.0, -10.0, 0.0));

        let overlays = world.query::<&OverlayMesh>().iter(world).count();
        let targets = world.query::<&EraserTarget>().iter(world).count();
        assert_eq!(overlays, 2);
        assert_eq!(targets, 1);

        // A second pass must not stack another scene on top.
        app.update();
        let world = app.world_mut();
        assert_eq!(world.query::<&PainMapScene>().iter(world).count(), 1);
    }

    #[test]
    fn rating_changes_reach_overlay_uniforms() {
        let mut app = scene_app();
        app.add_systems(
            Update,
            sync_overlay_intensity
                .after(compose_scene)
                .run_if(resource_exists_and_changed::<RegionIntensity>),
        );
        app.update();

        let neck = RegionKey::parse("Neck").unwrap();
        let mut intensity = RegionIntensity::default();
        intensity.set(neck, 40).unwrap();
        app.insert_resource(intensity);
        app.update();

        let materials = app.world().resource::<Assets<CompositeMaterial>>();
        assert_eq!(materials.len(), 2);
        for (_, material) in materials.iter() {
            let expected = match material.side {
                Side::Right => 0.4,
                Side::Left => 0.0,
            };
            assert_eq!(material.settings.region_count, 1);
            assert!((material.settings.opacity(0) - expected).abs() < 1e-6);
        }
    }
}
