use crate::engine::loading::manifest_loader::BaseModelSource;
use crate::engine::loading::progress::LoadingProgress;
use bevy::asset::LoadState;
use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::prelude::*;

/// The body mesh pulled out of the glTF file, ready to be instanced per side.
#[derive(Resource, Debug, Clone)]
pub struct ResolvedModel {
    pub name: String,
    pub mesh: Handle<Mesh>,
    pub material: Option<Handle<StandardMaterial>>,
    pub transform: Transform,
}

// Wait for the glTF and its meshes, then pick out the target mesh by name
pub fn resolve_base_model(
    mut loading_progress: ResMut<LoadingProgress>,
    source: Option<Res<BaseModelSource>>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
    gltf_meshes: Res<Assets<GltfMesh>>,
    gltf_nodes: Res<Assets<GltfNode>>,
) {
    if loading_progress.model_resolved {
        return;
    }
    let Some(source) = source else {
        return;
    };

    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(&source.gltf) {
        loading_progress.block(format!("base model failed to load: {err}"));
        return;
    }
    if !asset_server.is_loaded_with_dependencies(&source.gltf) {
        return;
    }
    let Some(gltf) = gltfs.get(&source.gltf) else {
        return;
    };

    match find_target_mesh(gltf, &gltf_meshes, &gltf_nodes, &source.target_mesh) {
        Some(model) => {
            info!("✓ Base model resolved: mesh '{}'", model.name);
            commands.insert_resource(model);
            loading_progress.model_resolved = true;
        }
        None => loading_progress.block(format!(
            "mesh '{}' not found in base model",
            source.target_mesh
        )),
    }
}

/// Look the mesh up by node name first so the node transform is kept, then by
/// mesh name.
pub fn find_target_mesh(
    gltf: &Gltf,
    gltf_meshes: &Assets<GltfMesh>,
    gltf_nodes: &Assets<GltfNode>,
    name: &str,
) -> Option<ResolvedModel> {
    let from_node = gltf
        .named_nodes
        .get(name)
        .and_then(|handle| gltf_nodes.get(handle))
        .and_then(|node| {
            let mesh = node.mesh.as_ref()?;
            Some((gltf_meshes.get(mesh)?, node.transform))
        });

    let (mesh, transform) = match from_node {
        Some(found) => found,
        None => {
            let mesh = gltf
                .named_meshes
                .get(name)
                .and_then(|handle| gltf_meshes.get(handle))?;
            (mesh, Transform::IDENTITY)
        }
    };

    let primitive = mesh.primitives.first()?;
    if mesh.primitives.len() > 1 {
        warn!(
            "Mesh '{}' has {} primitives, overlays use the first",
            name,
            mesh.primitives.len()
        );
    }

    Some(ResolvedModel {
        name: name.to_string(),
        mesh: primitive.mesh.clone(),
        material: primitive.material.clone(),
        transform,
    })
}
