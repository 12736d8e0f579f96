//! JSON-RPC 2.0 communication layer between the viewer and its host page.
//!
//! The viewer runs in an iframe. Requests, responses and notifications travel
//! over `postMessage` as JSON-RPC 2.0 strings.
//!
//! ## Message Flow
//!
//! ```text
//! Host page (parent)  <──postMessage──>  Viewer (iframe)
//!        │                                     │
//!        ├─ Request (with ID) ───────────────> │
//!        │                                     ├─ Handled between frames
//!        │ <────────────── Response (with ID) ─┤
//!        │                                     │
//!        │ <─────────── Notification (no ID) ──┤
//! ```
//!
//! Messages without an `id` still run their handler; they just get no reply.
//!
//! ## Calling From the Host Page
//!
//! ```typescript
//! iframe.contentWindow.postMessage(JSON.stringify({
//!   jsonrpc: "2.0",
//!   method: "set_intensities",
//!   params: { intensities: { Neck: 40, left_Shoulder: 100 } },
//!   id: 1
//! }), "*");
//! ```
//!
//! ## Sending Notifications from Bevy
//!
//! ```rust,ignore
//! fn your_system(mut rpc: ResMut<WebRpcInterface>) {
//!     rpc.send_notification("event_name", json!({ "data": "value" }));
//! }
//! ```
//!
//! ## Error Handling
//!
//! - `-32601`: Method not found
//! - `-32602`: Invalid params (unknown region key, value outside 0..=100, unknown tool)
//! - `-32603`: Internal error
//! - `-32000`: Request understood but refused (no ratings yet, malformed snapshot)
//!
//! ## Methods
//!
//! ### Ratings
//! - `set_intensities`: Apply a `{key: value}` map; unknown keys are skipped, a bad value rejects the call
//! - `get_intensities`: Current map plus the left/right overview rows
//!
//! ### Tools
//! - `tool_selection`: Activate the eraser (`{"tool": "eraser"}`)
//! - `clear_tool`: Hand the pointer back to the camera
//! - `get_eraser`: Active flag, radius and phase
//!
//! ### Snapshots
//! - `export_snapshot`: Answered by a `snapshot_exported` notification
//! - `import_snapshot`: Replace the scene with `{"snapshot": ...}`
//!
//! ### Diagnostics
//! - `get_fps`: Smoothed frame rate
//!
//! ## Notifications
//!
//! `loading_progress`, `assessment_required`, `tool_state_changed`,
//! `eraser_radius_changed`, `snapshot_exported`, `snapshot_imported`,
//! `snapshot_import_failed`, `fps_update`.

/// JSON-RPC 2.0 bridge: message listener, method dispatch and outgoing queue.
pub mod web_rpc;
