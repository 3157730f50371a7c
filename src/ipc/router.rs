use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type TryHandle = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: [TryHandle; 16] = [
    handlers::core::try_handle,
    handlers::calendar::try_handle,
    handlers::keyboard::try_handle,
    handlers::grades::try_handle,
    handlers::students::try_handle,
    handlers::exams::try_handle,
    handlers::absences::try_handle,
    handlers::defaulters::try_handle,
    handlers::memos::try_handle,
    handlers::notes::try_handle,
    handlers::curriculum::try_handle,
    handlers::settings::try_handle,
    handlers::transfer::try_handle,
    handlers::local_legacy::try_handle,
    handlers::backup_exchange::try_handle,
    handlers::export::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(id = %req.id, method = %req.method, "request");
    for try_handle in HANDLERS {
        if let Some(resp) = try_handle(state, &req) {
            return resp;
        }
    }

    tracing::warn!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
