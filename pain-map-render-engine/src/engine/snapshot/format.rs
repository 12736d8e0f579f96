use crate::engine::assets::region::Side;
use crate::engine::assets::region_intensity::RegionIntensity;
use crate::error::SnapshotError;
use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SNAPSHOT_VERSION: u32 = 1;
pub const GENERATOR: &str = "pain-map-render-engine";

/// Exported scene: geometry, materials and node tree, plus the ratings under `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub metadata: SnapshotMetadata,
    pub geometries: Vec<GeometryRecord>,
    pub materials: Vec<MaterialRecord>,
    pub object: NodeRecord,
    pub state: RegionIntensity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub version: u32,
    pub generator: String,
}

impl Default for SnapshotMetadata {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            generator: GENERATOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    pub id: String,
    pub positions: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<[f32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<[f32; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
}

/// A rated region drawn by an overlay, with the mask it samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionLayerRecord {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialRecord {
    Standard {
        id: String,
        base_colour: [f32; 4],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_colour_texture: Option<String>,
    },
    /// Region overlay. Rebuilt from the mask files it names; the shader is not stored.
    Overlay {
        id: String,
        side: Side,
        base_colour: [f32; 4],
        emissive: [f32; 4],
        depth_bias: f32,
        regions: Vec<RegionLayerRecord>,
    },
}

impl MaterialRecord {
    pub fn id(&self) -> &str {
        match self {
            Self::Standard { id, .. } | Self::Overlay { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, transform: &Transform) -> Self {
        Self {
            name: name.into(),
            translation: transform.translation.to_array(),
            rotation: transform.rotation.to_array(),
            scale: transform.scale.to_array(),
            geometry: None,
            material: None,
            children: Vec::new(),
        }
    }

    pub fn transform(&self) -> Transform {
        Transform {
            translation: Vec3::from(self.translation),
            rotation: Quat::from_array(self.rotation).normalize(),
            scale: Vec3::from(self.scale),
        }
    }

    /// This node and all its descendants, depth first.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeRecord::count).sum::<usize>()
    }
}

impl GeometryRecord {
    /// Capture a triangle-list mesh. Returns `None` without float positions.
    pub fn from_mesh(id: String, mesh: &Mesh) -> Option<Self> {
        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            return None;
        };
        let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(normals)) => Some(normals.clone()),
            _ => None,
        };
        let uvs = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(uvs)) => Some(uvs.clone()),
            _ => None,
        };
        let indices = mesh.indices().map(|indices| match indices {
            Indices::U16(values) => values.iter().map(|i| u32::from(*i)).collect(),
            Indices::U32(values) => values.clone(),
        });

        Some(Self {
            id,
            positions: positions.clone(),
            normals,
            uvs,
            indices,
        })
    }

    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        if let Some(normals) = &self.normals {
            mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals.clone());
        }
        if let Some(uvs) = &self.uvs {
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs.clone());
        }
        if let Some(indices) = &self.indices {
            mesh.insert_indices(Indices::U32(indices.clone()));
        }
        if self.normals.is_none() {
            mesh.compute_normals();
        }
        mesh
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        let malformed = |reason| SnapshotError::Geometry {
            id: self.id.clone(),
            reason,
        };
        let vertex_count = self.positions.len();
        if vertex_count == 0 {
            return Err(malformed("no positions"));
        }
        if self.normals.as_ref().is_some_and(|n| n.len() != vertex_count) {
            return Err(malformed("normal count differs from position count"));
        }
        if self.uvs.as_ref().is_some_and(|uv| uv.len() != vertex_count) {
            return Err(malformed("uv count differs from position count"));
        }
        match &self.indices {
            Some(indices) if indices.len() % 3 != 0 => {
                Err(malformed("index count is not a multiple of three"))
            }
            Some(indices) if indices.iter().any(|i| *i as usize >= vertex_count) => {
                Err(malformed("index out of range"))
            }
            None if vertex_count % 3 != 0 => {
                Err(malformed("vertex count is not a multiple of three"))
            }
            _ => Ok(()),
        }
    }
}

impl SceneSnapshot {
    /// Parse and validate an exported file.
    ///
    /// `state` is checked before the rest so a file from another tool is
    /// reported as such rather than as a shape mismatch.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("state").is_none_or(serde_json::Value::is_null) {
            return Err(SnapshotError::MissingState);
        }
        let snapshot: Self = serde_json::from_value(value)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        for geometry in &self.geometries {
            geometry.validate()?;
        }
        let geometry_ids: HashSet<&str> = self.geometries.iter().map(|g| g.id.as_str()).collect();
        let material_ids: HashSet<&str> = self.materials.iter().map(MaterialRecord::id).collect();
        validate_node(&self.object, &geometry_ids, &material_ids)
    }
}

fn validate_node(
    node: &NodeRecord,
    geometry_ids: &HashSet<&str>,
    material_ids: &HashSet<&str>,
) -> Result<(), SnapshotError> {
    if let Some(id) = node.geometry.as_deref().filter(|id| !geometry_ids.contains(id)) {
        return Err(SnapshotError::UnknownReference {
            kind: "geometry",
            id: id.to_string(),
        });
    }
    if let Some(id) = node.material.as_deref().filter(|id| !material_ids.contains(id)) {
        return Err(SnapshotError::UnknownReference {
            kind: "material",
            id: id.to_string(),
        });
    }
    node.children
        .iter()
        .try_for_each(|child| validate_node(child, geometry_ids, material_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::region::RegionKey;

    fn triangle() -> GeometryRecord {
        GeometryRecord {
            id: "geometry_0".into(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: None,
            uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
            indices: Some(vec![0, 1, 2]),
        }
    }

    fn snapshot(state: RegionIntensity) -> SceneSnapshot {
        let mut object = NodeRecord::new("PainMapScene", &Transform::from_xyz(0.0, -5.0, 0.0));
        let mut body = NodeRecord::new("FinalBaseMesh", &Transform::IDENTITY);
        body.geometry = Some("geometry_0".into());
        body.material = Some("material_0".into());
        object.children.push(body);

        SceneSnapshot {
            metadata: SnapshotMetadata::default(),
            geometries: vec![triangle()],
            materials: vec![MaterialRecord::Standard {
                id: "material_0".into(),
                base_colour: [1.0; 4],
                base_colour_texture: None,
            }],
            object,
            state,
        }
    }

    #[test]
    fn ratings_survive_export_and_import() {
        let mut state = RegionIntensity::default();
        for (i, key) in RegionKey::all().enumerate() {
            state.set(key, (i * 7 % 101) as u8).unwrap();
        }

        let json = snapshot(state.clone()).to_json().unwrap();
        let restored = SceneSnapshot::from_json(&json).unwrap();

        assert_eq!(restored.state, state);
        for key in RegionKey::all() {
            assert_eq!(restored.state.get(key), state.get(key), "{key}");
        }
        assert_eq!(restored.object.count(), 2);
    }

    #[test]
    fn state_is_stored_as_flat_key_map() {
        let mut state = RegionIntensity::default();
        state.set(RegionKey::parse("left_Shoulder").unwrap(), 65).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&snapshot(state).to_json().unwrap()).unwrap();

        assert_eq!(value["state"]["left_Shoulder"], 65);
        assert_eq!(value["state"]["Neck"], 0);
        assert_eq!(value["materials"][0]["type"], "standard");
    }

    #[test]
    fn rejects_unparseable_and_stateless_files() {
        assert!(matches!(
            SceneSnapshot::from_json("{ not json"),
            Err(SnapshotError::Parse(_))
        ));

        let mut value = serde_json::to_value(snapshot(RegionIntensity::default())).unwrap();
        value.as_object_mut().unwrap().remove("state");
        assert!(matches!(
            SceneSnapshot::from_json(&value.to_string()),
            Err(SnapshotError::MissingState)
        ));
    }

    #[test]
    fn rejects_dangling_references_and_bad_indices() {
        let mut dangling = snapshot(RegionIntensity::default());
        dangling.object.children[0].material = Some("material_9".into());
        let json = dangling.to_json().unwrap();
        assert!(matches!(
            SceneSnapshot::from_json(&json),
            Err(SnapshotError::UnknownReference { kind: "material", .. })
        ));

        let mut broken = snapshot(RegionIntensity::default());
        broken.geometries[0].indices = Some(vec![0, 1, 3]);
        let json = broken.to_json().unwrap();
        assert!(matches!(
            SceneSnapshot::from_json(&json),
            Err(SnapshotError::Geometry { .. })
        ));
    }

    #[test]
    fn geometry_rebuilds_the_mesh() {
        let mesh = triangle().to_mesh();
        let captured = GeometryRecord::from_mesh("again".into(), &mesh).unwrap();

        assert_eq!(captured.positions, triangle().positions);
        assert_eq!(captured.uvs, triangle().uvs);
        assert_eq!(captured.indices, Some(vec![0, 1, 2]));
        assert_eq!(captured.normals.map(|n| n.len()), Some(3));
    }
}
