use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::workspace::Workspace;
use serde_json::json;
use std::path::PathBuf;

fn required_path(req: &Request, key: &str) -> Result<PathBuf, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

fn handle_export_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out = match required_path(req, "outPath") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match backup::export_workspace_bundle(&ws.path, &out) {
        Ok(summary) => {
            tracing::info!(path = %out.display(), entries = summary.entry_count, "workspace exported");
            ok(
                &req.id,
                json!({
                    "path": out.to_string_lossy(),
                    "bundleFormat": summary.bundle_format,
                    "entryCount": summary.entry_count
                }),
            )
        }
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out.to_string_lossy() })),
        ),
    }
}

fn handle_import_workspace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let src = match required_path(req, "inPath") {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Some(workspace_path) = state.workspace.as_ref().map(|w| w.path.clone()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": src.to_string_lossy() })),
        );
    }

    // Release the database handle before its file is replaced.
    state.workspace = None;

    let imported = backup::import_workspace_bundle(&src, &workspace_path);
    let reopened = Workspace::open(&workspace_path);
    let summary = match imported {
        Ok(s) => s,
        Err(e) => {
            if let Ok(ws) = reopened {
                state.workspace = Some(ws);
            }
            return err(
                &req.id,
                "import_failed",
                format!("{e:#}"),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };
    match reopened {
        Ok(ws) => state.workspace = Some(ws),
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
    tracing::info!(
        path = %src.display(),
        format = %summary.bundle_format_detected,
        "workspace restored"
    );

    ok(
        &req.id,
        json!({
            "workspacePath": workspace_path.to_string_lossy(),
            "bundleFormatDetected": summary.bundle_format_detected,
            "entryCount": summary.entry_count
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspace" => Some(handle_export_workspace(state, req)),
        "backup.importWorkspace" => Some(handle_import_workspace(state, req)),
        _ => None,
    }
}
