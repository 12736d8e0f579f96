use crate::engine::assets::region_intensity::RegionIntensity;
use crate::engine::snapshot::export::{ExportDestination, ExportSnapshotEvent};
use crate::engine::snapshot::import::PendingImport;
use crate::tools::eraser::EraserTool;
use crate::tools::tool_manager::{
    ClearToolEvent, ToolManager, ToolSelectionEvent, ToolSelectionSource, ToolType,
};
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// Application error code for requests the viewer understood but could not honour.
const APPLICATION_ERROR: i32 = -32000;

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Outgoing traffic to the embedding page, flushed once per frame.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the frontend without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    #[cfg(test)]
    pub fn notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }

    #[cfg(test)]
    pub fn responses(&self) -> &[RpcResponse] {
        &self.outgoing_responses
    }
}

/// Plugin establishing the postMessage bridge for iframe deployment.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (
                    process_incoming_messages,
                    handle_rpc_messages,
                    send_outgoing_messages,
                )
                    .chain(),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    let Some(window) = window() else {
        error!("Window object not available, RPC listener not installed");
        return;
    };
    if let Err(e) =
        window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
    {
        error!("Failed to register message listener: {:?}", e);
        return;
    }

    // Ownership moves to JS so the listener outlives this system.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Messages posted by the page between frames.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Engine state reachable from RPC handlers.
#[derive(SystemParam)]
struct RpcTargets<'w, 's> {
    commands: Commands<'w, 's>,
    diagnostics: Res<'w, DiagnosticsStore>,
    intensity: Option<ResMut<'w, RegionIntensity>>,
    tool_manager: Res<'w, ToolManager>,
    eraser: Res<'w, EraserTool>,
    pending_import: ResMut<'w, PendingImport>,
    tool_events: EventWriter<'w, ToolSelectionEvent>,
    clear_events: EventWriter<'w, ClearToolEvent>,
    export_events: EventWriter<'w, ExportSnapshotEvent>,
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut targets: RpcTargets,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                debug!("Processing RPC method: {}", request.method);
                if let Some(response) =
                    handle_rpc_request(&request, &mut targets, &mut rpc_interface)
                {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Ignoring malformed RPC message: {}", parse_error);
                rpc_interface.send_notification(
                    "debug_message",
                    serde_json::json!({
                        "message": format!("Parse error: {}", parse_error)
                    }),
                );
            }
        }
    }
}

/// Dispatch one request. Notifications (no id) run their handler but get no reply.
fn handle_rpc_request(
    request: &RpcRequest,
    targets: &mut RpcTargets,
    rpc_interface: &mut WebRpcInterface,
) -> Option<RpcResponse> {
    let params = &request.params;
    let result = match request.method.as_str() {
        "set_intensities" => handle_set_intensities(params, targets),
        "get_intensities" => handle_get_intensities(targets),
        "tool_selection" => handle_tool_selection(params, targets),
        "clear_tool" => handle_clear_tool(targets),
        "get_eraser" => handle_get_eraser(targets),
        "export_snapshot" => handle_export_snapshot(targets),
        "import_snapshot" => handle_import_snapshot(params, targets, rpc_interface),
        "get_fps" => handle_get_fps(&targets.diagnostics),
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            return Some(create_error_response(
                request.id.clone()?,
                -32601,
                "Method not found",
                Some(serde_json::json!({"method": request.method})),
            ));
        }
    };

    let id = request.id.clone()?;
    match result {
        Ok(result_value) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        }),
        Err(error) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        }),
    }
}

/// Accepts `{"intensities": {key: value}}` or the flat map itself. Unknown keys
/// are skipped and reported; a bad value rejects the whole call.
fn handle_set_intensities(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    let entries = params
        .get("intensities")
        .unwrap_or(params)
        .as_object()
        .ok_or_else(|| RpcError::invalid_params("Expected a map of region keys to 0..=100"))?;
    let entries = entries.iter().map(|(key, value)| (key.as_str(), value));

    let report = match targets.intensity.as_deref_mut() {
        Some(intensity) => intensity
            .apply_strict(entries)
            .map_err(|e| RpcError::invalid_params(&e.to_string()))?,
        None => {
            let mut intensity = RegionIntensity::default();
            let report = intensity
                .apply_strict(entries)
                .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
            targets.commands.insert_resource(intensity);
            report
        }
    };

    info!("✓ {} region ratings applied", report.applied);
    Ok(serde_json::json!({
        "success": true,
        "applied": report.applied,
        "ignored": report.ignored
    }))
}

fn handle_get_intensities(targets: &RpcTargets) -> Result<serde_json::Value, RpcError> {
    let intensity = targets
        .intensity
        .as_deref()
        .ok_or_else(|| RpcError::application("No rating data available"))?;
    let intensities =
        serde_json::to_value(intensity).map_err(|e| RpcError::internal_error(&e.to_string()))?;

    Ok(serde_json::json!({
        "intensities": intensities,
        "overview": intensity.overview()
    }))
}

fn handle_tool_selection(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
) -> Result<serde_json::Value, RpcError> {
    #[derive(serde::Deserialize)]
    struct ToolSelectionParams {
        tool: String,
    }

    let tool_params = serde_json::from_value::<ToolSelectionParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'tool' parameter"))?;

    let tool_type = ToolType::from_string(&tool_params.tool)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown tool: {}", tool_params.tool)))?;

    targets.tool_events.write(ToolSelectionEvent {
        tool_type,
        source: ToolSelectionSource::Rpc,
    });

    info!("Tool selection event dispatched: {:?}", tool_type);

    Ok(serde_json::json!({
        "success": true,
        "active_tool": tool_type.as_str()
    }))
}

fn handle_clear_tool(targets: &mut RpcTargets) -> Result<serde_json::Value, RpcError> {
    targets.clear_events.write(ClearToolEvent {
        source: ToolSelectionSource::Rpc,
    });

    Ok(serde_json::json!({
        "success": true,
        "previous_tool": targets.tool_manager.active_tool().map(|tool| tool.as_str())
    }))
}

fn handle_get_eraser(targets: &RpcTargets) -> Result<serde_json::Value, RpcError> {
    Ok(serde_json::json!({
        "active": targets.eraser.is_active(),
        "radius": targets.eraser.radius(),
        "phase": targets.eraser.phase().as_str()
    }))
}

/// The snapshot itself arrives later as a `snapshot_exported` notification.
fn handle_export_snapshot(targets: &mut RpcTargets) -> Result<serde_json::Value, RpcError> {
    if targets.intensity.is_none() {
        return Err(RpcError::application("No rating data available"));
    }

    targets.export_events.write(ExportSnapshotEvent {
        destination: ExportDestination::Frontend,
    });

    Ok(serde_json::json!({
        "success": true,
        "queued": true
    }))
}

/// `snapshot` may be the parsed document or its raw text.
fn handle_import_snapshot(
    params: &serde_json::Value,
    targets: &mut RpcTargets,
    rpc_interface: &mut WebRpcInterface,
) -> Result<serde_json::Value, RpcError> {
    let snapshot = params
        .get("snapshot")
        .ok_or_else(|| RpcError::invalid_params("Expected 'snapshot' parameter"))?;
    let json = match snapshot {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    if let Err(e) = targets.pending_import.queue_json(&json, "rpc") {
        warn!("Snapshot import rejected: {}", e);
        rpc_interface.send_notification(
            "snapshot_import_failed",
            serde_json::json!({
                "error": e.to_string()
            }),
        );
        return Err(RpcError::application(&e.to_string()));
    }

    Ok(serde_json::json!({
        "success": true,
        "queued": true
    }))
}

fn handle_get_fps(diagnostics: &DiagnosticsStore) -> Result<serde_json::Value, RpcError> {
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps_diagnostic| fps_diagnostic.smoothed())
        .unwrap_or(0.0) as f32;

    Ok(serde_json::json!({
        "fps": fps
    }))
}

fn create_error_response(
    id: serde_json::Value,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id: Some(id),
    }
}

/// Notifications go out before responses queued in the same frame.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn application(message: &str) -> Self {
        Self {
            code: APPLICATION_ERROR,
            message: message.to_string(),
            data: None,
        }
    }
}
