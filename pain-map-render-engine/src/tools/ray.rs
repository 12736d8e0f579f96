use bevy::prelude::*;
use bevy::render::mesh::{Indices, VertexAttributeValues};

const EPSILON: f32 = 1e-7;

/// Closest surface point hit by a ray, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub distance: f32,
    /// Interpolated `UV_0`, absent when the mesh has no texture coordinates.
    pub uv: Option<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub vertices: [usize; 3],
    /// Weights of the three vertices, summing to one.
    pub barycentric: Vec3,
}

// Slab-method ray–AABB intersection, returns Some(t) or None
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let inv = Vec3::new(
        if ray_direction.x != 0.0 { 1.0 / ray_direction.x } else { f32::INFINITY },
        if ray_direction.y != 0.0 { 1.0 / ray_direction.y } else { f32::INFINITY },
        if ray_direction.z != 0.0 { 1.0 / ray_direction.z } else { f32::INFINITY },
    );

    let t1 = (min - ray_origin) * inv;
    let t2 = (max - ray_origin) * inv;
    let near = t1.min(t2).max_element();
    let far = t1.max(t2).min_element();

    if near > far || far < 0.0 {
        return None;
    }
    Some(if near >= 0.0 { near } else { far })
}

/// Möller–Trumbore, both faces. Returns (t, u, v) with u and v the weights of
/// the second and third vertex.
pub fn ray_triangle_hit(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<(f32, f32, f32)> {
    let edge1 = b - a;
    let edge2 = c - a;
    let h = direction.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    (t > EPSILON).then_some((t, u, v))
}

/// Nearest triangle hit among `triangles`.
pub fn ray_triangles_hit(
    origin: Vec3,
    direction: Vec3,
    positions: &[[f32; 3]],
    triangles: impl Iterator<Item = [usize; 3]>,
) -> Option<TriangleHit> {
    let mut closest: Option<TriangleHit> = None;
    for [i0, i1, i2] in triangles {
        let (Some(a), Some(b), Some(c)) = (positions.get(i0), positions.get(i1), positions.get(i2))
        else {
            continue;
        };
        let Some((t, u, v)) = ray_triangle_hit(
            origin,
            direction,
            Vec3::from(*a),
            Vec3::from(*b),
            Vec3::from(*c),
        ) else {
            continue;
        };
        if closest.is_none_or(|hit| t < hit.t) {
            closest = Some(TriangleHit {
                t,
                vertices: [i0, i1, i2],
                barycentric: Vec3::new(1.0 - u - v, u, v),
            });
        }
    }
    closest
}

pub fn interpolate_uv(uvs: &[[f32; 2]], hit: &TriangleHit) -> Option<Vec2> {
    let [i0, i1, i2] = hit.vertices;
    let (a, b, c) = (uvs.get(i0)?, uvs.get(i1)?, uvs.get(i2)?);
    let w = hit.barycentric;
    Some(Vec2::from(*a) * w.x + Vec2::from(*b) * w.y + Vec2::from(*c) * w.z)
}

/// Cast a world-space ray against a triangle-list mesh placed at `transform`.
///
/// `bounds` is the mesh-space box used to reject misses before walking the
/// triangles.
pub fn ray_mesh_hit(
    ray: Ray3d,
    mesh: &Mesh,
    transform: &GlobalTransform,
    bounds: Option<(Vec3, Vec3)>,
) -> Option<SurfaceHit> {
    let Some(VertexAttributeValues::Float32x3(positions)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return None;
    };

    let inverse = transform.affine().inverse();
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(*ray.direction);

    if let Some((min, max)) = bounds {
        ray_aabb_hit_t(origin, direction, min, max)?;
    }

    let hit = match mesh.indices() {
        Some(Indices::U32(indices)) => ray_triangles_hit(
            origin,
            direction,
            positions,
            indices
                .chunks_exact(3)
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize]),
        ),
        Some(Indices::U16(indices)) => ray_triangles_hit(
            origin,
            direction,
            positions,
            indices
                .chunks_exact(3)
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize]),
        ),
        None => ray_triangles_hit(
            origin,
            direction,
            positions,
            (0..positions.len() / 3).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]),
        ),
    }?;

    let uv = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
        Some(VertexAttributeValues::Float32x2(uvs)) => interpolate_uv(uvs, &hit),
        _ => None,
    };

    // The local ray parameter equals the world one: the affine map is linear along the ray.
    let point = ray.origin + *ray.direction * hit.t;
    Some(SurfaceHit {
        point,
        distance: hit.t,
        uv,
    })
}
