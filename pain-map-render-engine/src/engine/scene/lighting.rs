use crate::engine::camera::orbit_camera::OrbitCamera;
use bevy::prelude::*;
use constants::render_settings::{
    AMBIENT_BRIGHTNESS, CAMERA_START, DIRECTIONAL_ILLUMINANCE, LIGHT_OFFSET,
};

/// Directional light that rides along with the camera.
#[derive(Component)]
pub struct KeyLight;

pub fn spawn_lighting(commands: &mut Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: AMBIENT_BRIGHTNESS,
        ..default()
    });
    commands.spawn((
        DirectionalLight {
            illuminance: DIRECTIONAL_ILLUMINANCE,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_translation(Vec3::from(CAMERA_START) + Vec3::from(LIGHT_OFFSET))
            .looking_at(Vec3::ZERO, Vec3::Y),
        KeyLight,
    ));
}

/// Keep the key light just above the camera, aimed at the orbit focus.
pub fn follow_camera_light(
    orbit: Res<OrbitCamera>,
    mut lights: Query<&mut Transform, With<KeyLight>>,
) {
    let position = orbit.eye() + Vec3::from(LIGHT_OFFSET);
    for mut transform in &mut lights {
        *transform = Transform::from_translation(position).looking_at(orbit.focus_point, Vec3::Y);
    }
}
