use bevy::prelude::*;
use bevy::window::PresentMode;

pub fn create_window_config() -> Window {
    // Ctrl+wheel resizes the eraser, so the browser must not zoom the page.
    let window = Window {
        present_mode: PresentMode::AutoVsync,
        prevent_default_event_handling: true,
        ..default()
    };

    #[cfg(target_arch = "wasm32")]
    {
        Window {
            canvas: Some("#bevy".into()),
            fit_canvas_to_parent: true,
            ..window
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Window {
            title: "Pain Map".into(),
            ..window
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_default_handling_is_suppressed() {
        let window = create_window_config();
        assert!(window.prevent_default_event_handling);
        assert_eq!(window.present_mode, PresentMode::AutoVsync);
    }
}
