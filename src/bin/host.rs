//! The editor-host bridge: reads one JSON command per line from stdin,
//! writes one JSON event per line to stdout. The simplest possible
//! framing, matching the spec's line-delimited protocol.
//!
//! This binary is pure plumbing — every invariant lives in
//! `syncweave::sync_manager::SyncManager`. Malformed lines are
//! reported as an `error` event and do not crash the loop.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use syncweave::config::HostConfig;
use syncweave::metrics::{install_recorder, LatencyTracker, PerformanceMonitor};
use syncweave::operation::Operation;
use syncweave::session::SessionManager;
use syncweave::sync_manager::{RemoteApplyOutcome, SyncManager};

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum InboundCommand {
    Init {
        content: String,
        participant_id: String,
    },
    LocalInsert {
        position: usize,
        text: String,
    },
    LocalDelete {
        position: usize,
        length: usize,
    },
    RemoteOp {
        op: Operation,
    },
    Ack {
        op_id: String,
    },
    PeersClockQuery,
    DocumentSnapshotQuery,
    Join {
        participant_id: String,
    },
    RequestEditControl {
        participant_id: String,
    },
}

type OutboundTx = mpsc::UnboundedSender<serde_json::Value>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HostConfig::from_env().unwrap_or_else(|err| {
        eprintln!("using default host config: {err}");
        HostConfig::default()
    });

    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(err) = install_recorder(config.metrics_enabled) {
        tracing::warn!(%err, "failed to install metrics recorder, continuing without one");
    }

    let sync = Arc::new(SyncManager::with_history_capacity(config.history_capacity));
    let sessions = Arc::new(SessionManager::new());
    let session_id = sessions.create_session();
    let monitor = PerformanceMonitor::new();

    let (out_tx, out_rx) = mpsc::unbounded_channel::<serde_json::Value>();
    wire_observers(&sync, out_tx.clone());

    let writer = tokio::spawn(run_writer(out_rx));

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundCommand>(&line) {
            Ok(cmd) => handle_command(&sync, &sessions, session_id, &monitor, cmd, &out_tx),
            Err(err) => {
                tracing::error!(%err, line, "malformed inbound line");
                let _ = out_tx.send(json!({
                    "event": "error",
                    "kind": "Serialization",
                    "message": err.to_string(),
                }));
            }
        }
    }

    drop(out_tx);
    let _ = writer.await;
    Ok(())
}

/// Registers the Sync Manager's observer callbacks to forward onto the
/// outbound channel. Callbacks run synchronously with no lock held, so
/// this send is never re-entrant with the manager itself.
fn wire_observers(sync: &Arc<SyncManager>, out_tx: OutboundTx) {
    let tx = out_tx.clone();
    sync.on_document_changed(move |content, version| {
        let _ = tx.send(json!({
            "event": "document_changed",
            "content": content,
            "version": version,
        }));
    });

    let tx = out_tx.clone();
    sync.on_op_applied(move |op| {
        let _ = tx.send(json!({ "event": "op_applied", "operation": op }));
    });

    sync.on_conflict_resolved(move |local, remote, resolved| {
        let _ = out_tx.send(json!({
            "event": "conflict_resolved",
            "local": local,
            "remote": remote,
            "resolved": resolved,
        }));
    });
}

async fn run_writer(mut out_rx: mpsc::UnboundedReceiver<serde_json::Value>) {
    let mut stdout = tokio::io::stdout();
    while let Some(event) = out_rx.recv().await {
        match serde_json::to_vec(&event) {
            Ok(mut line) => {
                line.push(b'\n');
                if stdout.write_all(&line).await.is_err() {
                    break;
                }
            }
            Err(err) => tracing::error!(%err, "failed to encode outbound event"),
        }
    }
}

fn handle_command(
    sync: &Arc<SyncManager>,
    sessions: &Arc<SessionManager>,
    session_id: syncweave::session::SessionId,
    monitor: &PerformanceMonitor,
    cmd: InboundCommand,
    out_tx: &OutboundTx,
) {
    match cmd {
        InboundCommand::Init {
            content,
            participant_id,
        } => {
            sync.init(&participant_id);
            sync.set_document(content);
            let _ = sessions.join(session_id, &participant_id);
        }
        InboundCommand::LocalInsert { position, text } => {
            let tracker = LatencyTracker::start();
            let op = sync.make_insert(position, text);
            report_apply(sync.apply_local(op), out_tx);
            monitor.record_operation_latency(tracker.elapsed_ms());
        }
        InboundCommand::LocalDelete { position, length } => {
            let tracker = LatencyTracker::start();
            let op = sync.make_delete(position, length);
            report_apply(sync.apply_local(op), out_tx);
            monitor.record_operation_latency(tracker.elapsed_ms());
        }
        InboundCommand::RemoteOp { op } => {
            let tracker = LatencyTracker::start();
            match sync.apply_remote(op) {
                Ok(RemoteApplyOutcome::Duplicate) => monitor.record_duplicate_delivery(),
                Ok(RemoteApplyOutcome::Applied) => {}
                Err(err) => report_apply(Err(err), out_tx),
            }
            monitor.record_operation_latency(tracker.elapsed_ms());
        }
        InboundCommand::Ack { op_id } => sync.acknowledge(&op_id),
        InboundCommand::PeersClockQuery | InboundCommand::DocumentSnapshotQuery => {
            let snapshot = sync.get_document();
            let _ = out_tx.send(json!({
                "event": "document_changed",
                "content": snapshot.content,
                "version": snapshot.version,
                "clock": snapshot.clock,
            }));
        }
        InboundCommand::Join { participant_id } => {
            match sessions.join(session_id, &participant_id) {
                Ok(()) => {
                    let _ = out_tx.send(json!({
                        "event": "session_joined",
                        "participant_id": participant_id,
                    }));
                }
                Err(err) => report_session_error(err, out_tx),
            }
        }
        InboundCommand::RequestEditControl { participant_id } => {
            match sessions.request_edit_control(session_id, &participant_id) {
                Ok(state) => {
                    let _ = out_tx.send(json!({
                        "event": "edit_control_changed",
                        "state": state,
                    }));
                }
                Err(err) => report_session_error(err, out_tx),
            }
        }
    }
}

fn report_apply(result: Result<(), syncweave::OtError>, out_tx: &OutboundTx) {
    if let Err(err) = result {
        let _ = out_tx.send(json!({
            "event": "error",
            "kind": format!("{err:?}"),
            "message": err.to_string(),
        }));
    }
}

fn report_session_error(err: syncweave::SessionError, out_tx: &OutboundTx) {
    let _ = out_tx.send(json!({
        "event": "error",
        "kind": format!("{err:?}"),
        "message": err.to_string(),
    }));
}
