//! WebSocket hosting (spec section 6): the `/ws/race` endpoint. Grounded in
//! the teacher's `hosting::Server::run`/`Casino::bridge` (`hosting/
//! server.rs`, `hosting/casino.rs`), generalized from one actix-ws bridge
//! per poker room to one bridge per attached race spectator, all fed from
//! a single shared [`Orchestrator`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use futures::StreamExt;

use crate::bus::{Bus, Delivery};
use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::protocol::{ClientMessage, ServerMessage};

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub bus: Arc<Bus>,
    pub write_timeout: Duration,
    pub started_at: Instant,
}

pub struct Server;

impl Server {
    pub async fn run(config: Config, orchestrator: Arc<Orchestrator>, bus: Arc<Bus>) -> std::io::Result<()> {
        let write_timeout = Duration::from_millis(config.write_timeout_ms);
        let bind_addr = config.bind_addr.clone();
        let state = web::Data::new(AppState {
            orchestrator,
            bus: bus.clone(),
            write_timeout,
            started_at: Instant::now(),
        });

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                bus.sweep().await;
            }
        });

        log::info!("starting race hosting server on {bind_addr}");
        HttpServer::new(move || {
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header())
                .app_data(state.clone())
                .route("/ws/race", web::get().to(ws_race))
        })
        .bind(bind_addr)?
        .run()
        .await
    }
}

async fn ws_race(
    state: web::Data<AppState>,
    body: web::Payload,
    req: HttpRequest,
) -> impl Responder {
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            actix_web::rt::spawn(bridge(state.into_inner(), session, stream));
            response
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

/// One task per attached session: forwards broadcast snapshots out and
/// control-protocol commands in, exactly the shape of `Casino::bridge`.
async fn bridge(state: Arc<AppState>, mut session: actix_ws::Session, mut stream: actix_ws::MessageStream) {
    let (session_id, mailbox, sync) = state.bus.attach().await;
    if send(&mut session, &sync.to_json(), state.write_timeout, &state.bus, session_id)
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            biased;
            delivery = mailbox.pop() => {
                match delivery {
                    Delivery::Snapshot(snapshot) => {
                        let json = crate::protocol::snapshot_to_json(&snapshot);
                        if send(&mut session, &json, state.write_timeout, &state.bus, session_id).await.is_err() {
                            break;
                        }
                    }
                    Delivery::Fatal(message) => {
                        let err = ServerMessage::Error {
                            message,
                            kind: crate::errors::ErrorKind::Fatal,
                        };
                        let _ = send(&mut session, &err.to_json(), state.write_timeout, &state.bus, session_id).await;
                        let _ = session.close(None).await;
                        break;
                    }
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(actix_ws::Message::Text(text))) => {
                        if handle_client_message(&state, &mut session, session_id, &text).await {
                            break;
                        }
                    }
                    Some(Ok(actix_ws::Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => continue,
                }
            }
        }
    }

    state.bus.mark_unhealthy(session_id).await;
}

/// Handles one inbound control-protocol frame. Returns `true` when the
/// reported error is fatal (spec section 7), in which case the caller
/// closes the connection rather than continuing the bridge loop.
async fn handle_client_message(
    state: &Arc<AppState>,
    session: &mut actix_ws::Session,
    session_id: crate::bus::SessionId,
    text: &str,
) -> bool {
    let (reply, fatal) = match ClientMessage::parse(text) {
        Ok(ClientMessage::Start) => match state.orchestrator.start().await {
            Ok(()) => (None, false),
            Err(kind) => (Some(error_message(kind, "start")), kind.is_fatal()),
        },
        Ok(ClientMessage::Stop) => match state.orchestrator.stop().await {
            Ok(()) => (None, false),
            Err(kind) => (Some(error_message(kind, "stop")), kind.is_fatal()),
        },
        Ok(ClientMessage::Speed { value }) => match state.orchestrator.set_speed(value) {
            Ok(()) => (None, false),
            Err(kind) => (Some(error_message(kind, "speed")), kind.is_fatal()),
        },
        Ok(ClientMessage::Ping) => (
            Some(ServerMessage::Pong {
                timestamp: monotonic_ms(state.started_at),
            }),
            false,
        ),
        Ok(ClientMessage::Unknown) => (
            Some(error_message(crate::errors::ErrorKind::BadRequest, "unknown action")),
            false,
        ),
        Err(kind) => {
            let fatal = kind.is_fatal();
            (Some(error_message(kind, "malformed payload")), fatal)
        }
    };

    if let Some(reply) = reply {
        let _ = send(session, &reply.to_json(), state.write_timeout, &state.bus, session_id).await;
    }
    if fatal {
        let _ = session.close(None).await;
    }
    fatal
}

fn error_message(kind: crate::errors::ErrorKind, message: &str) -> ServerMessage {
    ServerMessage::Error {
        message: message.to_string(),
        kind,
    }
}

/// Milliseconds since this server process started (spec section 4.7's
/// `server_monotonic_ms`): derived from `Instant`, so it can never jump
/// backward the way a wall-clock read could on an NTP correction.
fn monotonic_ms(started_at: Instant) -> u64 {
    started_at.elapsed().as_millis() as u64
}

/// Writes a frame within the configured timeout; marks the session
/// unhealthy and reports the failure rather than letting a stalled client
/// block anyone else.
async fn send(
    session: &mut actix_ws::Session,
    text: &str,
    timeout: Duration,
    bus: &Bus,
    session_id: crate::bus::SessionId,
) -> Result<(), ()> {
    match tokio::time::timeout(timeout, session.text(text.to_string())).await {
        Ok(Ok(())) => Ok(()),
        _ => {
            bus.mark_unhealthy(session_id).await;
            Err(())
        }
    }
}
