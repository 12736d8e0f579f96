use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::eraser::EraserTool;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Enumeration of available tools in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    Eraser,
}

impl ToolType {
    /// Convert string identifier to tool type for RPC compatibility.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eraser" | "erase" => Some(Self::Eraser),
            _ => None,
        }
    }

    /// Identifier used in frontend messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eraser => "eraser",
        }
    }
}

/// Resource tracking the currently active tool.
///
/// An active tool owns the pointer; with none active the orbit camera does.
#[derive(Resource, Default)]
pub struct ToolManager {
    active_tool: Option<ToolType>,
}

impl ToolManager {
    /// Activate specified tool. Returns false when it was already active.
    pub fn activate_tool(&mut self, tool_type: ToolType) -> bool {
        if self.active_tool == Some(tool_type) {
            return false;
        }
        self.active_tool = Some(tool_type);
        info!("Tool manager activated: {}", tool_type.as_str());
        true
    }

    pub fn deactivate_current_tool(&mut self) -> Option<ToolType> {
        let previous = self.active_tool.take();
        if let Some(tool) = previous {
            info!("Tool manager deactivated: {}", tool.as_str());
        }
        previous
    }

    pub fn active_tool(&self) -> Option<ToolType> {
        self.active_tool
    }

    pub fn is_tool_active(&self, tool_type: ToolType) -> bool {
        self.active_tool == Some(tool_type)
    }

    /// Whether pointer input belongs to a tool rather than the camera.
    pub fn captures_pointer(&self) -> bool {
        self.active_tool.is_some()
    }
}

/// Event fired when tool selection changes via RPC or keyboard shortcuts.
#[derive(Event)]
pub struct ToolSelectionEvent {
    pub tool_type: ToolType,
    pub source: ToolSelectionSource,
}

/// Event fired to hand the pointer back to the camera.
#[derive(Event)]
pub struct ClearToolEvent {
    pub source: ToolSelectionSource,
}

/// Source of tool selection for debugging and conditional logic.
#[derive(Debug, Clone, Copy)]
pub enum ToolSelectionSource {
    Rpc,
    Keyboard,
}

pub fn handle_tool_selection_events(
    mut events: EventReader<ToolSelectionEvent>,
    mut tool_manager: ResMut<ToolManager>,
    mut eraser: ResMut<EraserTool>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        if !tool_manager.activate_tool(event.tool_type) {
            continue;
        }

        match event.tool_type {
            ToolType::Eraser => {
                eraser.set_active(true);
                info!("Eraser activated via {:?}, radius {}", event.source, eraser.radius());

                rpc_interface.send_notification(
                    "tool_state_changed",
                    serde_json::json!({
                        "tool": "eraser",
                        "active": true,
                        "radius": eraser.radius()
                    }),
                );
            }
        }
    }
}

pub fn handle_clear_tool_events(
    mut events: EventReader<ClearToolEvent>,
    mut tool_manager: ResMut<ToolManager>,
    mut eraser: ResMut<EraserTool>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        let Some(previous) = tool_manager.deactivate_current_tool() else {
            continue;
        };

        match previous {
            ToolType::Eraser => eraser.set_active(false),
        }
        info!("Tool cleared via {:?}, camera controls restored", event.source);

        rpc_interface.send_notification(
            "tool_state_changed",
            serde_json::json!({
                "tool": previous.as_str(),
                "active": false
            }),
        );
    }
}

/// `E` toggles the eraser on native builds.
#[cfg(not(target_arch = "wasm32"))]
pub fn handle_tool_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    tool_manager: Res<ToolManager>,
    mut tool_events: EventWriter<ToolSelectionEvent>,
    mut clear_events: EventWriter<ClearToolEvent>,
) {
    if !keyboard.just_pressed(KeyCode::KeyE) {
        return;
    }

    if tool_manager.is_tool_active(ToolType::Eraser) {
        clear_events.write(ClearToolEvent {
            source: ToolSelectionSource::Keyboard,
        });
    } else {
        tool_events.write(ToolSelectionEvent {
            tool_type: ToolType::Eraser,
            source: ToolSelectionSource::Keyboard,
        });
    }
}

/// Placeholder system for WASM builds where keyboard shortcuts are disabled.
#[cfg(target_arch = "wasm32")]
pub fn handle_tool_keyboard_shortcuts() {
    // Tools are controlled via RPC only.
}

#[cfg(not(target_arch = "wasm32"))]
pub fn clear_tool_on_escape(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut clear_events: EventWriter<ClearToolEvent>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        clear_events.write(ClearToolEvent {
            source: ToolSelectionSource::Keyboard,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ToolManager>()
            .init_resource::<EraserTool>()
            .init_resource::<WebRpcInterface>()
            .add_event::<ToolSelectionEvent>()
            .add_event::<ClearToolEvent>()
            .add_systems(
                Update,
                (handle_tool_selection_events, handle_clear_tool_events).chain(),
            );
        app
    }

    #[test]
    fn selecting_eraser_takes_the_pointer() {
        let mut app = tool_app();
        app.world_mut().send_event(ToolSelectionEvent {
            tool_type: ToolType::Eraser,
            source: ToolSelectionSource::Rpc,
        });
        app.update();

        assert!(app.world().resource::<ToolManager>().captures_pointer());
        assert!(app.world().resource::<EraserTool>().is_active());
    }

    #[test]
    fn clearing_returns_the_pointer_to_the_camera() {
        let mut app = tool_app();
        app.world_mut().send_event(ToolSelectionEvent {
            tool_type: ToolType::Eraser,
            source: ToolSelectionSource::Keyboard,
        });
        app.update();
        app.world_mut().send_event(ClearToolEvent {
            source: ToolSelectionSource::Keyboard,
        });
        app.update();

        assert!(!app.world().resource::<ToolManager>().captures_pointer());
        assert!(!app.world().resource::<EraserTool>().is_active());
    }

    #[test]
    fn tool_names_parse_case_insensitively() {
        assert_eq!(ToolType::from_string("Eraser"), Some(ToolType::Eraser));
        assert_eq!(ToolType::from_string("erase"), Some(ToolType::Eraser));
        assert_eq!(ToolType::from_string("polygon"), None);
    }
}
