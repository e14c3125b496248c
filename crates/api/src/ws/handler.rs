use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Streams every hub event to the client as JSON text until either side
/// goes away. Inbound text is read and ignored.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut subscription = state.hub.subscribe();
    let observer_id = subscription.id;
    info!(%observer_id, "Log observer connected");

    let (mut sender, mut receiver) = socket.split();

    let forward = async {
        while let Some(event) = subscription.events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%observer_id, %e, "Failed to serialise hub event");
                    continue;
                }
            };
            if sender.send(Message::text(text)).await.is_err() {
                break;
            }
        }
    };

    let drain = async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Text(text)) => debug!(%observer_id, len = text.len(), "Ignoring inbound text"),
                Ok(_) => {}
                Err(e) => {
                    warn!(%observer_id, %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = forward => {}
        _ = drain => {}
    }

    state.hub.unsubscribe(&observer_id);
    info!(%observer_id, "Log observer disconnected");
}
