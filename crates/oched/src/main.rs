//! oched - The oche background service
//!
//! This is the main entry point for the oched service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Training engine
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use oche_api::{
    ClientRole, Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response,
    ResponsePayload,
};
use oche_config::{load_config, TrainingConfig};
use oche_core::{CoreEvent, MatchUpdate, NewSession, SessionUpdate, TrainingEngine};
use oche_ipc::{IpcServer, ServerMessage};
use oche_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use oche_util::{default_config_path, ClientId, RateLimiter, DATABASE_FILENAME};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// oched - Darts training session service
#[derive(Parser, Debug)]
#[command(name = "oched")]
#[command(about = "Darts training session service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/oche/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set OCHE_SOCKET env var)
    #[arg(short, long, env = "OCHE_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set OCHE_DATA_DIR env var)
    #[arg(short, long, env = "OCHE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Main service state
struct Service {
    engine: TrainingEngine,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    rate_limiter: RateLimiter,
}

/// A missing config file is not an error: the service runs on defaults
fn load_or_default(path: &Path) -> Result<TrainingConfig> {
    if !path.exists() {
        warn!(config_path = %path.display(), "No configuration file, using defaults");
        return Ok(TrainingConfig::default());
    }

    let config = load_config(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    info!(
        config_path = %path.display(),
        player_count = config.players.len(),
        game_mode_count = config.game_modes.len(),
        "Configuration loaded"
    );
    Ok(config)
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_or_default(&args.config)?;

        // Determine paths
        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        // Initialize training engine and seed the directory
        let mut engine = TrainingEngine::new(store.clone(), config.training.clone());
        engine
            .seed_directory(&config.players, &config.game_modes)
            .context("Failed to seed players and game modes")?;

        // Initialize IPC server
        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        // Rate limiter: 30 requests per second per client
        let rate_limiter = RateLimiter::new(30, Duration::from_secs(1));

        Ok(Self {
            engine,
            ipc: Arc::new(ipc),
            store,
            rate_limiter,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        // Wrap mutable state
        let engine = Arc::new(Mutex::new(self.engine));
        let rate_limiter = Arc::new(Mutex::new(self.rate_limiter));
        let store = self.store.clone();

        // Spawn IPC accept task
        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // IPC messages
                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&engine, &ipc_ref, &store, &rate_limiter, msg).await;
                }
            }
        }

        info!("Shutting down oched");

        ipc_ref.broadcast_event(Event::new(EventPayload::Shutdown));

        if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(
        engine: &Arc<Mutex<TrainingEngine>>,
        ipc: &Arc<IpcServer>,
        store: &Arc<dyn Store>,
        rate_limiter: &Arc<Mutex<RateLimiter>>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                // Rate limiting
                {
                    let mut limiter = rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                let role = ipc
                    .get_client_info(&client_id)
                    .await
                    .map(|info| info.role)
                    .unwrap_or(ClientRole::Member);

                let (response, events) = {
                    let mut eng = engine.lock().await;
                    let response = Self::handle_command(
                        &mut eng,
                        &client_id,
                        role,
                        request.request_id,
                        request.command,
                    );
                    (response, eng.drain_events())
                };

                let _ = ipc.send_response(&client_id, response).await;

                for event in events {
                    ipc.broadcast_event(Event::new(event_payload(event)));
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    role: format!("{:?}", info.role),
                    uid: info.uid,
                }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientDisconnected {
                    client_id: client_id.to_string(),
                }));

                let mut limiter = rate_limiter.lock().await;
                limiter.remove_client(&client_id);
            }
        }
    }

    fn handle_command(
        engine: &mut TrainingEngine,
        client_id: &ClientId,
        role: ClientRole,
        request_id: u64,
        command: Command,
    ) -> Response {
        match dispatch(engine, client_id, role, command) {
            Ok(payload) => Response::success(request_id, payload),
            Err(e) => {
                debug!(request_id, code = ?e.code, message = %e.message, "Command failed");
                Response::error(request_id, e)
            }
        }
    }
}

fn permission_denied() -> Result<ResponsePayload, ErrorInfo> {
    Err(ErrorInfo::new(ErrorCode::PermissionDenied, "Admin role required"))
}

fn dispatch(
    engine: &mut TrainingEngine,
    client_id: &ClientId,
    role: ClientRole,
    command: Command,
) -> Result<ResponsePayload, ErrorInfo> {
    let payload = match command {
        Command::ListPlayers => ResponsePayload::Players(engine.list_players()?),

        Command::RegisterPlayer {
            name,
            email,
            nickname,
        } => {
            if !role.can_manage_directory() {
                return permission_denied();
            }
            ResponsePayload::Player(engine.register_player(&name, &email, nickname.as_deref())?)
        }

        Command::ListGameModes => ResponsePayload::GameModes(engine.list_game_modes()?),

        Command::ListSessions => ResponsePayload::Sessions(engine.list_sessions()?),

        Command::GetSession { session_id } => {
            ResponsePayload::Session(Box::new(engine.get_session(&session_id)?))
        }

        Command::CreateSession {
            name,
            description,
            scheduled_at,
            cost_per_attendee,
            created_by,
        } => {
            let new = NewSession {
                name,
                description,
                scheduled_at,
                cost_per_attendee,
                created_by,
            };
            ResponsePayload::SessionUpdated(engine.create_session(new)?)
        }

        Command::UpdateSession {
            session_id,
            name,
            description,
            scheduled_at,
            cost_per_attendee,
            status,
        } => {
            let update = SessionUpdate {
                name,
                description,
                scheduled_at,
                cost_per_attendee,
                status,
            };
            ResponsePayload::SessionUpdated(engine.update_session(&session_id, update)?)
        }

        Command::ForceSessionStatus { session_id, status } => {
            if !role.can_force_status() {
                return permission_denied();
            }
            ResponsePayload::SessionUpdated(engine.force_session_status(&session_id, &status)?)
        }

        Command::StartSession { session_id } => {
            ResponsePayload::SessionUpdated(engine.start_session(&session_id)?)
        }

        Command::FinishSession { session_id } => {
            ResponsePayload::SessionUpdated(engine.finish_session(&session_id)?)
        }

        Command::CancelSession { session_id } => {
            ResponsePayload::SessionUpdated(engine.cancel_session(&session_id)?)
        }

        Command::DeleteSession { session_id } => {
            engine.delete_session(&session_id)?;
            ResponsePayload::SessionDeleted { session_id }
        }

        Command::AddGuest {
            session_id,
            guest_name,
        } => ResponsePayload::Attendee(engine.add_guest(&session_id, guest_name.as_deref())?),

        Command::RemoveAttendee { attendee_id } => {
            engine.remove_attendee(&attendee_id)?;
            ResponsePayload::AttendeeRemoved { attendee_id }
        }

        Command::SetAttendance {
            attendee_id,
            attended,
        } => ResponsePayload::Attendee(engine.set_attendance(&attendee_id, attended)?),

        Command::GenerateMatches {
            session_id,
            game_mode_id,
        } => ResponsePayload::Matches(engine.generate_matches(&session_id, &game_mode_id)?),

        Command::ListMatches { session_id } => {
            ResponsePayload::Matches(engine.list_matches(&session_id)?)
        }

        Command::CreateMatch {
            session_id,
            game_mode_id,
            player1,
            player2,
        } => ResponsePayload::Match(engine.create_match(
            &session_id,
            &game_mode_id,
            &player1,
            &player2,
        )?),

        Command::UpdateMatch {
            match_id,
            player1_score,
            player2_score,
            status,
            winner,
        } => {
            let update = MatchUpdate {
                player1_score,
                player2_score,
                status,
                winner,
            };
            ResponsePayload::Match(engine.update_match(&match_id, &update)?)
        }

        Command::DeleteMatch { match_id } => {
            engine.delete_match(&match_id)?;
            ResponsePayload::MatchDeleted { match_id }
        }

        Command::GetCosts { session_id } => {
            ResponsePayload::Costs(engine.compute_costs(&session_id)?)
        }

        Command::SubscribeEvents => ResponsePayload::Subscribed {
            client_id: *client_id,
        },

        Command::UnsubscribeEvents => ResponsePayload::Unsubscribed,

        Command::GetHealth => {
            let store_ok = engine.store_healthy();
            ResponsePayload::Health(HealthStatus {
                live: true,
                ready: store_ok,
                store_ok,
            })
        }

        Command::Ping => ResponsePayload::Pong,
    };

    Ok(payload)
}

fn event_payload(event: CoreEvent) -> EventPayload {
    match event {
        CoreEvent::SessionCreated {
            session_id,
            name,
            roster_size,
        } => EventPayload::SessionCreated {
            session_id,
            name,
            roster_size,
        },
        CoreEvent::SessionStatusChanged {
            session_id,
            from,
            to,
            forced,
        } => EventPayload::SessionStatusChanged {
            session_id,
            from,
            to,
            forced,
        },
        CoreEvent::SessionDeleted { session_id } => EventPayload::SessionDeleted { session_id },
        CoreEvent::RosterChanged {
            session_id,
            attendee_id,
        } => EventPayload::RosterChanged {
            session_id,
            attendee_id,
        },
        CoreEvent::MatchesGenerated { session_id, count } => {
            EventPayload::MatchesGenerated { session_id, count }
        }
        CoreEvent::MatchChanged {
            session_id,
            match_id,
            status,
        } => EventPayload::MatchChanged {
            session_id,
            match_id,
            status,
        },
        CoreEvent::MatchDeleted {
            session_id,
            match_id,
        } => EventPayload::MatchDeleted {
            session_id,
            match_id,
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "oched starting");

    let service = Service::new(&args).await?;
    service.run().await
}
