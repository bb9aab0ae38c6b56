use std::{io, sync::Arc};

use comms::{
    FrameReceiver, FrameSender,
    msg::{FeedKind, Request, Response},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    signal,
};

use crate::registry::{ClientId, Registry};

/// Accepts connections until ctrl-c, spawning one task per client
/// connection.
pub async fn run(listener: TcpListener, registry: Arc<Registry>) -> io::Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = accepted?;
                debug!("connection from {addr}");

                let (rx, tx) = stream.into_split();
                let (rx, tx) = comms::channel(rx, tx);
                tokio::spawn(serve_client(rx, tx, addr, Arc::clone(&registry)));
            }
            _ = signal::ctrl_c() => {
                info!("received ctrl-c, shutting down accept loop");
                break;
            }
        }
    }

    Ok(())
}

/// Serves one client connection: every decoded request is answered with an
/// ack or nack. Runs until EOF or a transport error.
pub async fn serve_client<R, W>(
    mut rx: FrameReceiver<R>,
    mut tx: FrameSender<W>,
    client: ClientId,
    registry: Arc<Registry>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let response = match rx.recv::<Request>().await {
            Ok(request) => submit(&registry, client, request),
            // The frame arrived whole but did not decode; the stream is
            // still aligned, keep serving.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("undecodable request from {client}: {e}");
                Response::NACK
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    warn!("connection error for {client}: {e}");
                }
                break;
            }
        };

        if let Err(e) = tx.send(&response).await {
            warn!("failed to respond to {client}: {e}");
            break;
        }
    }
}

/// The ingress boundary: checks the payload is there, ensures the
/// (client, feed) worker exists and enqueues the record. An ack means
/// queued, not validated or persisted.
fn submit(registry: &Registry, client: ClientId, request: Request) -> Response {
    let Request::Submit { feed, data } = request;

    let Some(record) = data else {
        warn!("submission without data from {client}");
        return Response::NACK;
    };

    let queue = match feed {
        FeedKind::Training => match registry.ensure_training(client) {
            Ok(queue) => queue,
            Err(e) => {
                warn!("training registration failed for {client}: {e}");
                return Response::NACK;
            }
        },
        FeedKind::Inference => registry.ensure_inference(client),
    };

    if queue.send(record).is_err() {
        // The worker tore down between lookup and enqueue; a retry gets a
        // fresh registration.
        warn!("queue closed for {client} ({feed})");
        return Response::NACK;
    }

    Response::ACK
}
