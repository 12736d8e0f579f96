//! Interactive tools for editing the displayed pain map.
//!
//! ## Tool Manager Architecture
//!
//! The `ToolManager` resource holds exclusive pointer ownership:
//! - With no tool active the orbit camera reads mouse input
//! - With the eraser active the camera is frozen and strokes reach the mask
//! - Tools are toggled by keyboard (native) or RPC (WASM)
//!
//! ```text
//! Keyboard/RPC Input
//!   └─> ToolSelectionEvent / ClearToolEvent
//!       └─> handle_tool_selection_events() / handle_clear_tool_events()
//!           ├─> Switch EraserTool phase
//!           └─> Send `tool_state_changed` to frontend
//! ```
//!
//! ## Eraser (`ToolType::Eraser`)
//! - **Activation**: `E` key (native) or `tool_selection` RPC with `"eraser"`;
//!   `Escape` or `clear_tool` hands the pointer back to the camera
//! - **Workflow**:
//!   1. Pointer moves cast a camera ray against the erasable overlay mesh
//!   2. The cursor sphere follows the hit point
//!   3. Holding the left button stamps a disc into the erase mask at the hit UV
//!   4. Ctrl/Cmd + wheel resizes the disc between 5 and 50 pixels

/// Erase brush state machine, cursor, and stroke systems.
pub mod eraser;

/// Ray intersection against boxes, triangles, and meshes.
pub mod ray;

/// Exclusive tool activation with RPC notifications.
pub mod tool_manager;
