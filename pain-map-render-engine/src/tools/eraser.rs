use crate::engine::assets::editable_mask::{EditableMask, uv_to_pixel};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::ray::{SurfaceHit, ray_mesh_hit};
use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::eraser::{
    CURSOR_ALPHA, CURSOR_COLOUR, CURSOR_RADIUS_DIVISOR, DEFAULT_RADIUS, MAX_RADIUS, MIN_RADIUS,
    RADIUS_STEP,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EraserPhase {
    #[default]
    Idle,
    /// Active, pointer up. The cursor follows the surface.
    Hovering,
    /// Active, pointer down. Every frame with a surface hit stamps the mask.
    Erasing,
}

impl EraserPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hovering => "hovering",
            Self::Erasing => "erasing",
        }
    }
}

/// Brush state for erasing overlay pixels.
#[derive(Resource, Debug)]
pub struct EraserTool {
    phase: EraserPhase,
    radius: u32,
}

impl Default for EraserTool {
    fn default() -> Self {
        Self {
            phase: EraserPhase::Idle,
            radius: DEFAULT_RADIUS,
        }
    }
}

impl EraserTool {
    pub fn set_active(&mut self, active: bool) {
        self.phase = if active {
            EraserPhase::Hovering
        } else {
            EraserPhase::Idle
        };
    }

    pub fn is_active(&self) -> bool {
        self.phase != EraserPhase::Idle
    }

    pub fn phase(&self) -> EraserPhase {
        self.phase
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Pointer down. Only a hovering brush starts a stroke.
    pub fn press(&mut self) -> bool {
        if self.phase == EraserPhase::Hovering {
            self.phase = EraserPhase::Erasing;
            return true;
        }
        false
    }

    pub fn release(&mut self) {
        if self.phase == EraserPhase::Erasing {
            self.phase = EraserPhase::Hovering;
        }
    }

    /// One wheel notch. Scrolling up grows the brush. Returns whether the
    /// radius changed.
    pub fn adjust_radius(&mut self, scroll_y: f32) -> bool {
        let previous = self.radius;
        if scroll_y > 0.0 {
            self.radius = (self.radius + RADIUS_STEP).min(MAX_RADIUS);
        } else if scroll_y < 0.0 {
            self.radius = self.radius.saturating_sub(RADIUS_STEP).max(MIN_RADIUS);
        }
        self.radius != previous
    }

    /// Cursor sphere scale relative to its spawn size.
    pub fn cursor_scale(&self) -> f32 {
        self.radius as f32 / DEFAULT_RADIUS as f32
    }
}

/// Translucent sphere marking where the brush would land.
#[derive(Component)]
pub struct EraserCursor;

/// Mesh whose surface strokes land on, with its mesh-space bounding box.
#[derive(Component, Debug, Clone, Copy)]
pub struct EraserTarget {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

pub fn spawn_eraser_cursor(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let [r, g, b] = CURSOR_COLOUR;
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(DEFAULT_RADIUS as f32 / CURSOR_RADIUS_DIVISOR))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(r, g, b).with_alpha(CURSOR_ALPHA),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        })),
        Transform::default(),
        Visibility::Hidden,
        EraserCursor,
    ));
}

/// Modifier + wheel resizes the brush while the eraser is active.
pub fn eraser_radius_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut scroll_events: EventReader<MouseWheel>,
    mut eraser: ResMut<EraserTool>,
    mut cursor_query: Query<&mut Transform, With<EraserCursor>>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    let modifier = keyboard.any_pressed([
        KeyCode::ControlLeft,
        KeyCode::ControlRight,
        KeyCode::SuperLeft,
        KeyCode::SuperRight,
    ]);
    if !eraser.is_active() || !modifier {
        scroll_events.clear();
        return;
    }

    let mut changed = false;
    for event in scroll_events.read() {
        changed |= eraser.adjust_radius(event.y);
    }
    if !changed {
        return;
    }

    for mut transform in &mut cursor_query {
        transform.scale = Vec3::splat(eraser.cursor_scale());
    }
    debug!("Eraser radius {}", eraser.radius());
    rpc_interface.send_notification(
        "eraser_radius_changed",
        serde_json::json!({
            "radius": eraser.radius()
        }),
    );
}

/// Cast the pointer into the scene, move the cursor, and stamp the mask while
/// the button is held.
pub fn eraser_pointer_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    targets: Query<(&Mesh3d, &GlobalTransform, &EraserTarget)>,
    meshes: Res<Assets<Mesh>>,
    mask: Option<ResMut<EditableMask>>,
    mut eraser: ResMut<EraserTool>,
    mut cursor_query: Query<(&mut Transform, &mut Visibility), With<EraserCursor>>,
) {
    let Some(mut mask) = mask.filter(|_| eraser.is_active() && !targets.is_empty()) else {
        hide_cursor(&mut cursor_query);
        return;
    };

    if mouse_button.just_pressed(MouseButton::Left) {
        eraser.press();
    }
    if mouse_button.just_released(MouseButton::Left) {
        eraser.release();
    }

    let hit = pointer_ray(&windows, &camera_query).and_then(|ray| {
        targets
            .iter()
            .filter_map(|(mesh, transform, target)| {
                let mesh = meshes.get(&mesh.0)?;
                ray_mesh_hit(
                    ray,
                    mesh,
                    transform,
                    Some((target.bounds_min, target.bounds_max)),
                )
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    });

    let Some(hit) = hit else {
        hide_cursor(&mut cursor_query);
        return;
    };

    for (mut transform, mut visibility) in &mut cursor_query {
        transform.translation = hit.point;
        transform.scale = Vec3::splat(eraser.cursor_scale());
        *visibility = Visibility::Visible;
    }

    if eraser.phase() == EraserPhase::Erasing {
        stamp_at_hit(&mut mask, &hit, eraser.radius());
    }
}

/// Stamp one disc where the hit's UV lands. Hits without UVs do nothing.
pub fn stamp_at_hit(mask: &mut EditableMask, hit: &SurfaceHit, radius: u32) -> usize {
    let size = mask.dimensions();
    let Some(pixel) = hit.uv.and_then(|uv| uv_to_pixel(uv, size.x, size.y)) else {
        return 0;
    };
    mask.stamp_disc(pixel, radius)
}

fn pointer_ray(
    windows: &Query<&Window, With<PrimaryWindow>>,
    camera_query: &Query<(&Camera, &GlobalTransform), With<Camera3d>>,
) -> Option<Ray3d> {
    let cursor_position = windows.single().ok()?.cursor_position()?;
    let (camera, camera_transform) = camera_query.single().ok()?;
    camera.viewport_to_world(camera_transform, cursor_position).ok()
}

fn hide_cursor(cursor_query: &mut Query<(&mut Transform, &mut Visibility), With<EraserCursor>>) {
    for (_, mut visibility) in cursor_query.iter_mut() {
        *visibility = Visibility::Hidden;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_mask(size: u32) -> EditableMask {
        let bytes = vec![0u8; (size * size * 4) as usize];
        EditableMask::from_bytes(size, size, &bytes, 4, 1).unwrap()
    }

    fn hit_at(uv: Option<Vec2>) -> SurfaceHit {
        SurfaceHit {
            point: Vec3::ZERO,
            distance: 1.0,
            uv,
        }
    }

    #[test]
    fn stroke_walks_the_state_machine() {
        let mut eraser = EraserTool::default();
        assert_eq!(eraser.phase(), EraserPhase::Idle);
        assert!(!eraser.press());

        eraser.set_active(true);
        assert_eq!(eraser.phase(), EraserPhase::Hovering);
        assert!(eraser.press());
        assert_eq!(eraser.phase(), EraserPhase::Erasing);

        eraser.release();
        assert_eq!(eraser.phase(), EraserPhase::Hovering);

        eraser.set_active(false);
        assert_eq!(eraser.phase(), EraserPhase::Idle);
        assert!(!eraser.is_active());
    }

    #[test]
    fn one_notch_up_grows_radius_by_a_step() {
        let mut eraser = EraserTool::default();
        assert_eq!(eraser.radius(), 10);

        assert!(eraser.adjust_radius(1.0));
        assert_eq!(eraser.radius(), 15);
        assert_eq!(eraser.cursor_scale(), 1.5);
    }

    #[test]
    fn radius_stays_within_limits() {
        let mut eraser = EraserTool::default();
        for _ in 0..20 {
            eraser.adjust_radius(1.0);
        }
        assert_eq!(eraser.radius(), 50);
        assert!(!eraser.adjust_radius(3.0));

        for _ in 0..20 {
            eraser.adjust_radius(-1.0);
        }
        assert_eq!(eraser.radius(), 5);
        assert!(!eraser.adjust_radius(0.0));
    }

    #[test]
    fn stamp_lands_on_uv_pixel() {
        let mut mask = blank_mask(1024);

        let changed = stamp_at_hit(&mut mask, &hit_at(Some(Vec2::splat(0.5))), 10);

        assert!(changed > 0);
        assert_eq!(mask.erase_value(512, 512), Some(1.0));
        assert_eq!(mask.erase_value(512, 540), Some(0.0));
    }

    #[test]
    fn hits_without_usable_uv_leave_mask_alone() {
        let mut mask = blank_mask(16);

        assert_eq!(stamp_at_hit(&mut mask, &hit_at(None), 10), 0);
        assert_eq!(stamp_at_hit(&mut mask, &hit_at(Some(Vec2::new(1.5, 0.5))), 10), 0);
        assert!(!mask.is_dirty());
    }
}
