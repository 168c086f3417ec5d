//! WebSocket upgrade handler and per-connection game session

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::snapshot::build_views;
use crate::game::GameSession;
use crate::http::middleware::{authenticate_player, AuthError};
use crate::store::{Player, SharedGame};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, MoveData, ServerMsg};
use crate::ws::registry::{ConnectionHandle, DeliveryError, SessionRegistry, OUTBOUND_QUEUE_CAPACITY};

/// How long a closing connection may spend flushing queued messages
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Query parameters for the play endpoint
#[derive(Debug, Deserialize)]
pub struct PlayQuery {
    /// Bearer token issued by the identity provider
    #[serde(default)]
    pub token: String,
}

/// Reasons a connection cannot be bound or has to be dropped
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid game id")]
    InvalidGameId,

    #[error("Game not found")]
    GameNotFound,

    #[error("Player is not a participant of this game")]
    NotParticipant,

    #[error("Outbound queue closed")]
    OutboundClosed,
}

/// WebSocket upgrade handler for `GET /games/:game_id/play?token=...`.
///
/// Authentication happens after the upgrade so a refusal can be reported
/// with a policy-violation close frame.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(game_id): Path<String>,
    Query(query): Query<PlayQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, game_id, query.token, state))
}

/// Authenticate the credential and check the player belongs to the game
pub fn bind_connection(
    state: &AppState,
    game_id: &str,
    token: &str,
) -> Result<(Player, Uuid, SharedGame), SessionError> {
    let player = authenticate_player(state, token)?;
    let game_id = Uuid::parse_str(game_id).map_err(|_| SessionError::InvalidGameId)?;
    let game = state.games.get(&game_id).ok_or(SessionError::GameNotFound)?;

    if !game.lock().game.is_participant(player.id) {
        return Err(SessionError::NotParticipant);
    }

    Ok((player, game_id, game))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, raw_game_id: String, token: String, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let (player, game_id, game) = match bind_connection(&state, &raw_game_id, &token) {
        Ok(bound) => bound,
        Err(e) => {
            warn!(game_id = %raw_game_id, error = %e, "Refusing game connection");
            let frame = CloseFrame {
                code: close_code::POLICY,
                reason: Cow::Owned(e.to_string()),
            };
            let _ = ws_sink.send(Message::Close(Some(frame))).await;
            return;
        }
    };

    info!(game_id = %game_id, player_id = %player.id, "New game connection");

    let (handle, outbound_rx) = ConnectionHandle::new(OUTBOUND_QUEUE_CAPACITY);
    let connection_id = handle.id;
    let mut writer = tokio::spawn(write_loop(ws_sink, outbound_rx, connection_id));

    let connection = GameConnection::open(state.sessions.clone(), game_id, player, game, handle);
    let rate_limiter = ConnectionRateLimiter::new(state.config.ws_rate_limit);

    run_session(&connection, ws_stream, &rate_limiter).await;

    // Unregisters; once every sender is gone the writer flushes and exits
    drop(connection);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        debug!(connection_id = %connection_id, "Writer did not drain in time");
        writer.abort();
    }

    info!(game_id = %game_id, connection_id = %connection_id, "Game connection closed");
}

/// Reader loop: inbound frames are handled one at a time, in order
async fn run_session(
    connection: &GameConnection,
    mut ws_stream: SplitStream<WebSocket>,
    rate_limiter: &ConnectionRateLimiter,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let handled = if rate_limiter.check_message() {
                    connection.handle_text(&text)
                } else {
                    warn!(player_id = %connection.player.id, "Rate limited game message");
                    connection.reject_rate_limited()
                };

                if let Err(e) = handled {
                    error!(
                        game_id = %connection.game_id,
                        player_id = %connection.player.id,
                        error = %e,
                        "Dropping game connection"
                    );
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %connection.player.id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %connection.player.id, "Client initiated close");
                break;
            }
            Err(e) => {
                warn!(player_id = %connection.player.id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Writer task: outbound queue -> WebSocket
async fn write_loop(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<ServerMsg>,
    connection_id: Uuid,
) {
    while let Some(msg) = outbound_rx.recv().await {
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "Failed to encode message");
                continue;
            }
        };

        if let Err(e) = ws_sink.send(Message::Text(json)).await {
            debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
            return;
        }
    }

    let _ = ws_sink.send(Message::Close(None)).await;
}

/// One bound connection: a player in a game.
///
/// Registered on open and unregistered on drop, which also covers a
/// panicking session task.
pub struct GameConnection {
    game_id: Uuid,
    player: Player,
    game: SharedGame,
    registry: Arc<SessionRegistry>,
    handle: ConnectionHandle,
}

impl GameConnection {
    /// Register the connection and acknowledge it to the player
    pub fn open(
        registry: Arc<SessionRegistry>,
        game_id: Uuid,
        player: Player,
        game: SharedGame,
        handle: ConnectionHandle,
    ) -> Self {
        registry.register(game_id, player.id, handle.clone());

        let connection = Self {
            game_id,
            player,
            game,
            registry,
            handle,
        };
        let _ = connection.reply(ServerMsg::Connected { game_id });
        connection
    }

    /// Dispatch one inbound text frame.
    ///
    /// Rule violations and malformed messages are answered with a personal
    /// error; only a dead outbound queue is an `Err`.
    pub fn handle_text(&self, text: &str) -> Result<(), SessionError> {
        match serde_json::from_str::<ClientMsg>(text) {
            Ok(ClientMsg::StartGame) => self.start_game(),
            Ok(ClientMsg::Move { data }) => self.make_move(data),
            Err(e) => {
                debug!(player_id = %self.player.id, error = %e, "Failed to parse client message");
                self.reply(ServerMsg::error("bad_message", format!("Invalid message: {}", e)))
            }
        }
    }

    /// Tell the player a message was dropped by the rate limiter
    pub fn reject_rate_limited(&self) -> Result<(), SessionError> {
        self.reply(ServerMsg::error(
            "rate_limited",
            "Too many messages, this one was ignored",
        ))
    }

    fn start_game(&self) -> Result<(), SessionError> {
        let mut session = self.game.lock();

        if let Err(e) = session.start() {
            debug!(game_id = %self.game_id, error = %e, "Start rejected");
            return self.reply(ServerMsg::from(&e));
        }

        info!(game_id = %self.game_id, player_id = %self.player.id, "Game started by player");
        self.registry.broadcast(self.game_id, ServerMsg::GameStarted);
        self.push_state(&session);
        Ok(())
    }

    fn make_move(&self, data: MoveData) -> Result<(), SessionError> {
        let mut session = self.game.lock();

        let outcome = match session.apply_move(self.player.id, data.x, data.y) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(game_id = %self.game_id, player_id = %self.player.id, error = %e, "Move rejected");
                return self.reply(ServerMsg::from(&e));
            }
        };

        debug!(
            game_id = %self.game_id,
            player_id = %self.player.id,
            x = data.x,
            y = data.y,
            hit = outcome.is_hit,
            sunk = outcome.sunk,
            "Shot resolved"
        );

        // Enqueued under the game lock so both peers see states in commit order
        match outcome.winner {
            Some(winner_id) => {
                info!(game_id = %self.game_id, winner_id = %winner_id, "Broadcasting game over");
                self.registry.broadcast(
                    self.game_id,
                    ServerMsg::GameOver {
                        winner_id,
                        winner_name: self.player.username.clone(),
                    },
                );
            }
            None => self.push_state(&session),
        }
        Ok(())
    }

    /// Send each participant their own view of the session
    fn push_state(&self, session: &GameSession) {
        for (player_id, view) in build_views(session) {
            self.registry
                .send_to(self.game_id, player_id, ServerMsg::GameState(Box::new(view)));
        }
    }

    /// Personal message on this connection, whether or not it is still the
    /// registered one
    fn reply(&self, msg: ServerMsg) -> Result<(), SessionError> {
        match self.handle.deliver(msg) {
            Ok(()) => Ok(()),
            Err(DeliveryError::Full) => {
                warn!(player_id = %self.player.id, "Outbound queue full, dropping reply");
                Ok(())
            }
            Err(DeliveryError::Closed) => Err(SessionError::OutboundClosed),
        }
    }
}

impl Drop for GameConnection {
    fn drop(&mut self) {
        self.registry
            .unregister_connection(self.game_id, self.player.id, self.handle.id);
    }
}
