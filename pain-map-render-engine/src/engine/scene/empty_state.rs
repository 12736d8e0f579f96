use crate::rpc::web_rpc::WebRpcInterface;
use bevy::prelude::*;

const TITLE: &str = "No Data Available";
const MESSAGE: &str = "Please complete the pain assessment first to view your results.";

#[derive(Component)]
pub struct EmptyStateView;

/// Shown when the viewer is ready but no ratings have arrived.
pub fn show_empty_state(mut commands: Commands, mut rpc_interface: ResMut<WebRpcInterface>) {
    info!("No rating data, waiting for the assessment");

    commands
        .spawn((
            EmptyStateView,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(12.0),
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(TITLE),
                TextFont {
                    font_size: 28.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
            parent.spawn((
                Text::new(MESSAGE),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(0.8, 0.8, 0.8)),
            ));
        });

    rpc_interface.send_notification(
        "assessment_required",
        serde_json::json!({
            "title": TITLE,
            "message": MESSAGE
        }),
    );
}

pub fn hide_empty_state(mut commands: Commands, views: Query<Entity, With<EmptyStateView>>) {
    for entity in &views {
        commands.entity(entity).despawn();
    }
}
