//! Line-based TCP front end.
//!
//! Each connection gets a reader (this task) and a writer task fed by the session's
//! outbox. Logout runs however the connection ends.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use crate::api::connections::Session;
use crate::app::App;
use crate::use_cases::commands::LineOutcome;

const NAME_PROMPT: &str = "By what name are you known?";

/// Accept connections until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    tokio::pin!(shutdown);
    tracing::info!(addr = %listener.local_addr()?, "Listening for players");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let app = app.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, peer, app).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                }
            },
            _ = &mut shutdown => {
                tracing::info!("Shutting down listener");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, app: Arc<App>) {
    tracing::info!(peer = %peer, "Connection opened");
    let framed = Framed::new(
        stream,
        LinesCodec::new_with_max_length(app.settings.max_line_length),
    );
    let (mut sink, mut lines) = framed.split();

    // Name prompt until a login succeeds or the client goes away.
    let (session, rx) = loop {
        if sink.send(NAME_PROMPT.to_string()).await.is_err() {
            return;
        }
        let name = match lines.next().await {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                tracing::debug!(peer = %peer, error = %e, "Connection closed before login");
                return;
            }
            None => return,
        };
        if name.trim().is_empty() {
            continue;
        }

        let (tx, rx) = mpsc::channel(app.settings.outbox_capacity);
        match app.join.login(&name, tx).await {
            Ok(session) => break (session, rx),
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "Login refused");
                if sink.send(e.player_message()).await.is_err() {
                    return;
                }
            }
        }
    };

    let player_id = session.player_id();
    tracing::info!(peer = %peer, player_id = %player_id, name = %session.name(), "Player connected");

    let write_timeout = app.settings.write_timeout;
    let writer = tokio::spawn(async move {
        let mut rx = rx;
        while let Some(line) = rx.recv().await {
            match tokio::time::timeout(write_timeout, sink.send(line)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!(player_id = %player_id, error = %e, "Write failed");
                    break;
                }
                Err(_) => {
                    tracing::warn!(player_id = %player_id, "Write timed out, dropping connection");
                    break;
                }
            }
        }
    });

    read_commands(&app, &session, &mut lines).await;

    if let Err(e) = app.join.logout(player_id).await {
        tracing::warn!(player_id = %player_id, error = %e, "Logout did not complete cleanly");
    }
    drop(session);
    finish_writer(writer, write_timeout).await;
    tracing::info!(peer = %peer, player_id = %player_id, "Connection closed");
}

async fn read_commands<S>(app: &App, session: &Arc<Session>, lines: &mut S)
where
    S: futures_util::Stream<Item = Result<String, LinesCodecError>> + Unpin,
{
    let player_id = session.player_id();
    let (_, area) = session.location().await;
    let mut route = match app.areas.route(area) {
        Ok(route) => route,
        Err(e) => {
            tracing::error!(player_id = %player_id, error = %e, "No area route for player");
            let _ = session.send("The world is unavailable right now. Try again later.");
            return;
        }
    };

    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    if app.router.handle_command(player_id, &line, &mut route).await == LineOutcome::Quit {
                        return;
                    }
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    tracing::info!(player_id = %player_id, "Line too long, disconnecting");
                    let _ = session.send("Line too long.");
                    return;
                }
                Some(Err(e)) => {
                    tracing::debug!(player_id = %player_id, error = %e, "Read failed");
                    return;
                }
                None => return,
            },
            _ = session.closed() => return,
        }
    }
}

/// Give the writer a moment to flush the last lines once every outbox sender is gone.
async fn finish_writer(writer: tokio::task::JoinHandle<()>, wait: Duration) {
    let abort = writer.abort_handle();
    if tokio::time::timeout(wait, writer).await.is_err() {
        abort.abort();
    }
}
