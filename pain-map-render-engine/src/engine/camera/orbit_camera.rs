use crate::tools::tool_manager::ToolManager;
use bevy::input::mouse::MouseScrollUnit;
use bevy::math::EulerRot;
use bevy::{
    input::mouse::{MouseMotion, MouseWheel},
    prelude::*,
};
use constants::render_settings::{CAMERA_MAX_DISTANCE, CAMERA_MIN_DISTANCE, CAMERA_START};

const YAW_SENSITIVITY: f32 = 0.005;
const PITCH_SENSITIVITY: f32 = 0.005;
const PITCH_LIMIT: f32 = 1.55;
const ZOOM_STEP: f32 = 0.1;

#[derive(Resource, Debug, Clone)]
pub struct OrbitCamera {
    pub focus_point: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at_origin_from(Vec3::from(CAMERA_START))
    }
}

impl OrbitCamera {
    pub fn looking_at_origin_from(position: Vec3) -> Self {
        let distance = position.length().max(CAMERA_MIN_DISTANCE);
        let offset = position / distance;
        Self {
            focus_point: Vec3::ZERO,
            distance,
            yaw: offset.x.atan2(offset.z),
            pitch: -offset.y.clamp(-1.0, 1.0).asin(),
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Camera position: `distance` back from the focus along the view axis.
    pub fn eye(&self) -> Vec3 {
        self.focus_point + self.rotation() * Vec3::Z * self.distance
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).with_rotation(self.rotation())
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * YAW_SENSITIVITY;
        self.pitch = (self.pitch - delta.y * PITCH_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Slide the focus in the view plane; speed scales with distance.
    pub fn pan(&mut self, delta: Vec2) {
        let rotation = self.rotation();
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;
        let speed = self.distance * 0.002;
        self.focus_point += (-right * delta.x + up * delta.y) * speed;
    }

    pub fn zoom(&mut self, notches: f32) {
        self.distance = (self.distance * (1.0 - notches * ZOOM_STEP))
            .clamp(CAMERA_MIN_DISTANCE, CAMERA_MAX_DISTANCE);
    }
}

/// Left drag orbits, right drag pans, wheel zooms. Frozen while a tool owns
/// the pointer.
pub fn camera_controller(
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
    mut orbit: ResMut<OrbitCamera>,
    tool_manager: Res<ToolManager>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
) {
    if tool_manager.captures_pointer() {
        mouse_motion.clear();
        scroll_events.clear();
        return;
    }

    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    if mouse_delta != Vec2::ZERO {
        if mouse_button.pressed(MouseButton::Left) {
            orbit.orbit(mouse_delta);
        } else if mouse_button.pressed(MouseButton::Right) {
            orbit.pan(mouse_delta);
        }
    }

    // Mouse wheel scroll accumulation (pixel and line scroll)
    let mut scroll_accum = 0.0;
    for ev in scroll_events.read() {
        scroll_accum += match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.01,
        };
    }
    if scroll_accum.abs() > f32::EPSILON {
        orbit.zoom(scroll_accum);
    }

    if let Ok(mut camera_transform) = camera_query.single_mut() {
        *camera_transform = orbit.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_configured_position_facing_origin() {
        let orbit = OrbitCamera::default();
        let transform = orbit.transform();

        assert!((transform.translation - Vec3::new(-3.0, 2.0, -7.0)).length() < 1e-4);
        let towards_origin = (-transform.translation).normalize();
        assert!((transform.forward().as_vec3() - towards_origin).length() < 1e-4);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut orbit = OrbitCamera::default();
        for _ in 0..100 {
            orbit.zoom(1.0);
        }
        assert_eq!(orbit.distance, CAMERA_MIN_DISTANCE);
        for _ in 0..100 {
            orbit.zoom(-1.0);
        }
        assert_eq!(orbit.distance, CAMERA_MAX_DISTANCE);
    }

    #[test]
    fn orbit_keeps_distance_and_limits_pitch() {
        let mut orbit = OrbitCamera::default();
        let before = orbit.eye().length();

        orbit.orbit(Vec2::new(120.0, -10_000.0));

        assert!((orbit.eye().length() - before).abs() < 1e-4);
        assert_eq!(orbit.pitch, PITCH_LIMIT);
    }
}
