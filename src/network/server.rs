//! Library server: login, session lifecycle and the accept loop
//!
//! [`ServerContext`] holds everything a connection needs and is shared by every connection
//! task. [`LibraryServer`] owns the listener and spawns those tasks.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rand::Rng;
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

use super::connection::{offline_uuid, read_packet, write_packet, TcpConnectionHandle};
use super::error::{connection_error, NetworkResult};
use super::handlers::handle_packet;
use super::packet::{ClientPacket, Packet, RosterAction, RosterEntry, ServerPacket};
use super::protocol::Protocol;
use super::webhook::ReportWebhook;
use crate::chat::{ChatColor, ChatMessage, ChatPart, ClickAction};
use crate::config::{ConfigWatcher, LiveConfig, LiveConfigHandle, ServerConfig};
use crate::constants::text::PAGE_TEXT_LENGTH;
use crate::error::LibraryResult;
use crate::library::AddressCodec;
use crate::presence::{
    ConnectionHandle, ConnectionId, ConnectionState, PresenceCoordinator, RepeatingTask, Session,
};

/// State shared by every connection
pub struct ServerContext {
    config: ServerConfig,
    codec: AddressCodec,
    presence: PresenceCoordinator,
    live: LiveConfigHandle,
    report_webhook: Option<ReportWebhook>,
    next_connection_id: AtomicU32,
    reconcile_task: Mutex<Option<RepeatingTask>>,
    packets_received: AtomicU64,
}

impl ServerContext {
    pub fn new(config: ServerConfig, live: LiveConfig) -> LibraryResult<Arc<Self>> {
        let codec = AddressCodec::new(config.library.clone())?;
        let presence = PresenceCoordinator::new(Arc::new(config.library.clone()));
        let report_webhook = config
            .report_webhook_url
            .as_deref()
            .map(ReportWebhook::new)
            .transpose()?;

        Ok(Arc::new(Self {
            config,
            codec,
            presence,
            live: LiveConfigHandle::new(live),
            report_webhook,
            next_connection_id: AtomicU32::new(1),
            reconcile_task: Mutex::new(None),
            packets_received: AtomicU64::new(0),
        }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn codec(&self) -> &AddressCodec {
        &self.codec
    }

    pub fn presence(&self) -> &PresenceCoordinator {
        &self.presence
    }

    pub fn live(&self) -> Arc<LiveConfig> {
        self.live.snapshot()
    }

    pub fn is_admin(&self, uuid: &Uuid) -> bool {
        self.live.snapshot().is_admin(uuid)
    }

    /// Where `/report` submissions go; `None` turns reporting off
    pub fn report_webhook(&self) -> Option<&ReportWebhook> {
        self.report_webhook.as_ref()
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    /// Send a chat line, stripped of colours if the viewer asked for that
    pub fn send_chat(&self, session: &Session, message: ChatMessage) {
        let colors = session.state().chat_colors;
        let message = if colors { message } else { message.without_colors() };
        session.send(ServerPacket::Chat { message });
    }

    pub fn send_error(&self, session: &Session, message: impl Into<String>) {
        self.send_chat(session, ChatMessage::error(message));
    }

    pub fn send_notice(&self, session: &Session, message: impl Into<String>) {
        self.send_chat(session, ChatMessage::notice(message));
    }

    /// Send to every ready session except `exclude`
    pub fn broadcast_except(&self, packet: ServerPacket, exclude: Option<ConnectionId>) {
        for session in self.presence.ready_sessions() {
            if Some(session.id()) != exclude {
                session.send(packet.clone());
            }
        }
    }

    pub fn broadcast(&self, packet: ServerPacket) {
        self.broadcast_except(packet, None);
    }

    /// Chat line to every ready session; `respect_toggle` skips sessions with chat off
    pub fn broadcast_chat(&self, message: &ChatMessage, respect_toggle: bool) {
        for session in self.presence.ready_sessions() {
            if respect_toggle && !session.state().chat_enabled {
                continue;
            }
            self.send_chat(&session, message.clone());
        }
    }

    /// Username coloured by role
    pub fn name_tag(&self, message: ChatMessage, uuid: &Uuid, username: &str) -> ChatMessage {
        let color = if self.is_admin(uuid) {
            ChatColor::LightPurple
        } else {
            ChatColor::DarkGray
        };
        message.colored(username, color)
    }

    /// Reason to turn a login away, if any
    pub fn check_admission(&self, username: &str) -> Option<String> {
        let live = self.live.snapshot();
        let uuid = offline_uuid(username);

        if let Some(message) = live.ban_message(&uuid) {
            return Some(message);
        }
        if self.presence.len() >= live.max_players && !live.is_admin(&uuid) {
            return Some(live.server_full_message.clone());
        }
        if self.presence.find_by_username(username).is_some() {
            return Some("That username is already in the library.".to_string());
        }
        None
    }

    /// Bring a validated connection into the library
    pub fn handle_connect<R: Rng + ?Sized>(
        &self,
        handle: Arc<dyn ConnectionHandle>,
        rng: &mut R,
    ) -> LibraryResult<Arc<Session>> {
        let live = self.live.snapshot();
        let id = handle.id();
        let uuid = handle.uuid();
        let username = handle.username().to_string();

        let spawn = self.config.library.random_spawn(rng);
        let session = self.presence.connect(
            handle,
            spawn,
            ConnectionState::new(live.default_chat_enabled, live.default_presence_enabled),
        );

        session.send(ServerPacket::LoginAccept {
            connection_id: id,
            uuid,
            motd: live.motd.clone(),
        });
        self.presence.teleport(id, spawn)?;

        let entry = RosterEntry {
            id,
            uuid,
            username: username.clone(),
        };
        self.broadcast_except(
            ServerPacket::Roster {
                action: RosterAction::Add,
                entries: vec![entry],
            },
            Some(id),
        );
        session.send(ServerPacket::Roster {
            action: RosterAction::Add,
            entries: self
                .presence
                .sessions()
                .iter()
                .map(|other| RosterEntry {
                    id: other.id(),
                    uuid: other.uuid(),
                    username: other.username().to_string(),
                })
                .collect(),
        });

        self.presence.mark_ready(id)?;
        info!(
            "{} has entered the library ({}/{})",
            username,
            self.presence.len(),
            live.max_players
        );

        let joined = self
            .name_tag(ChatMessage::new(), &uuid, &username)
            .colored(" has entered the library.", ChatColor::Yellow);
        self.broadcast_chat(&joined, false);
        self.send_chat(&session, self.welcome_message());

        Ok(session)
    }

    /// Remove a connection and tell everyone it left
    pub fn disconnect_player(&self, id: ConnectionId) {
        let Some(session) = self.presence.disconnect(id) else {
            return;
        };

        self.broadcast(ServerPacket::Roster {
            action: RosterAction::Remove,
            entries: vec![RosterEntry {
                id,
                uuid: session.uuid(),
                username: session.username().to_string(),
            }],
        });
        let left = self
            .name_tag(ChatMessage::new(), &session.uuid(), session.username())
            .colored(" has left the library.", ChatColor::Yellow);
        self.broadcast_chat(&left, false);

        info!(
            "{} has left the library ({}/{})",
            session.username(),
            self.presence.len(),
            self.live.snapshot().max_players
        );
    }

    fn welcome_message(&self) -> ChatMessage {
        ChatMessage::new()
            .highlighted(format!("=== Welcome to the {} ===\n", self.config.server_name), ChatColor::LightPurple)
            .text("This library contains every possible ")
            .highlighted(format!("{} character", PAGE_TEXT_LENGTH), ChatColor::LightPurple)
            .text(" page.\n\nRight click a bookshelf to open it and take out books.\n")
            .text("They will respawn, so no need to put them back.\n\nType ")
            .push(
                ChatPart::new("/help")
                    .color(ChatColor::LightPurple)
                    .bold()
                    .on_click(ClickAction::SuggestCommand("/help".to_string())),
            )
            .text(" for a list of commands, and have fun exploring.\n\nLearn more here: ")
            .link(&self.config.learn_more_url)
    }

    /// Start (or restart) the periodic reconciliation pass
    pub fn start_reconcile(self: &Arc<Self>) {
        let period = self.live.snapshot().reconcile_interval();
        let context: Weak<Self> = Arc::downgrade(self);
        let task = RepeatingTask::spawn(period, move || {
            if let Some(context) = context.upgrade() {
                let report = context.presence.reconcile();
                if report.spawned + report.destroyed > 0 {
                    debug!(
                        "Reconciled occupants: {} spawned, {} updated, {} destroyed",
                        report.spawned, report.updated, report.destroyed
                    );
                }
            }
        });

        // replacing the old task aborts it
        *self.reconcile_task.lock() = Some(task);
        debug!("Reconciliation every {:?}", period);
    }

    /// Install a new live configuration and act on what changed
    pub fn apply_live_config(self: &Arc<Self>, config: LiveConfig) {
        let old = self.live.replace(config);
        let new = self.live.snapshot();
        info!(
            "Live configuration reloaded ({} admins, {} bans, {} mutes)",
            new.admins.len(),
            new.bans.len(),
            new.mutes.len()
        );

        let running = self.reconcile_task.lock().is_some();
        if running && old.reconcile_interval() != new.reconcile_interval() {
            self.start_reconcile();
        }

        for session in self.presence.sessions() {
            if let Some(message) = new.ban_message(&session.uuid()) {
                info!("Kicking banned user {}", session.username());
                session.handle().close(&message);
            }
        }
    }

    /// Re-read the live configuration file whenever it changes
    pub async fn watch_live_config(self: Arc<Self>, mut watcher: ConfigWatcher) {
        while watcher.next_change().await.is_some() {
            match LiveConfig::load(watcher.path()) {
                Ok(config) => self.apply_live_config(config),
                Err(e) => warn!("Ignoring live configuration change: {}", e),
            }
        }
    }

    pub(crate) fn note_packet(&self, session: &Session, packet: &ClientPacket) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        if self.config.debug {
            debug!("{} -> {}: {:?}", session.username(), packet.name(), packet);
        }
    }
}

/// TCP front end of the library
pub struct LibraryServer {
    context: Arc<ServerContext>,
    listener: TcpListener,
}

impl LibraryServer {
    /// Bind the listening socket
    pub async fn bind(context: Arc<ServerContext>) -> NetworkResult<Self> {
        let address = context.config.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| connection_error(&address, e))?;

        Ok(Self { context, listener })
    }

    pub fn local_addr(&self) -> NetworkResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Accept connections until the listener fails
    pub async fn run(self, watcher: Option<ConfigWatcher>) -> NetworkResult<()> {
        info!(
            "Starting {} on {}",
            self.context.config.server_name,
            self.listener.local_addr()?
        );

        self.context.start_reconcile();
        if let Some(watcher) = watcher {
            tokio::spawn(self.context.clone().watch_live_config(watcher));
        }

        loop {
            let (stream, addr) = self.listener.accept().await?;
            let context = self.context.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(context, stream, addr).await {
                    warn!("Connection from {} ended with an error: {}", addr, e);
                }
            });
        }
    }
}

/// Kick a client that never made it into the library
async fn refuse(stream: &mut TcpStream, reason: String) -> NetworkResult<()> {
    write_packet(stream, &Packet::Server(ServerPacket::Kick { reason })).await?;
    Ok(())
}

async fn handle_connection(
    context: Arc<ServerContext>,
    mut stream: TcpStream,
    addr: SocketAddr,
) -> NetworkResult<()> {
    debug!("New connection from {}", addr);

    let (protocol_version, username) = match read_packet(&mut stream).await? {
        Some(Packet::Client(ClientPacket::Login {
            protocol_version,
            username,
        })) => (protocol_version, username),
        Some(_) => return refuse(&mut stream, "Expected login".to_string()).await,
        None => return Ok(()),
    };

    if let Err(reason) = Protocol::validate_version(protocol_version)
        .and_then(|_| Protocol::validate_username(&username))
    {
        debug!("Rejected login from {}: {}", addr, reason);
        return refuse(&mut stream, reason).await;
    }
    if let Some(reason) = context.check_admission(&username) {
        info!("Turned away {} ({}): {}", username, addr, reason);
        return refuse(&mut stream, reason).await;
    }

    let _ = stream.set_nodelay(true);
    let (mut reader, writer) = stream.into_split();
    let id = context.next_connection_id();
    let (handle, writer_task) = TcpConnectionHandle::spawn(id, username, addr, writer);

    let session = context.handle_connect(handle.clone(), &mut rand::thread_rng())?;

    loop {
        let packet = tokio::select! {
            packet = read_packet(&mut reader) => packet,
            _ = handle.closed() => break,
        };

        match packet {
            Ok(Some(Packet::Client(ClientPacket::Disconnect { reason }))) => {
                debug!("{} disconnected: {}", session.username(), reason);
                break;
            }
            Ok(Some(Packet::Client(packet))) => {
                if let Err(e) = handle_packet(&context, &session, packet) {
                    error!("Failed to handle packet from {}: {}", session.username(), e);
                }
            }
            Ok(Some(Packet::Server(_))) => {
                debug!("{} sent a server packet; ignoring", session.username());
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Dropping {}: {}", session.username(), e);
                break;
            }
        }
    }

    context.disconnect_player(id);
    drop(session);
    drop(handle);
    let _ = writer_task.await;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::presence::coordinator::tests::RecordingHandle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(crate) fn context_with(live: LiveConfig) -> Arc<ServerContext> {
        ServerContext::new(ServerConfig::default(), live).unwrap()
    }

    pub(crate) fn admit(context: &ServerContext, id: ConnectionId, name: &str) -> Arc<RecordingHandle> {
        let handle = RecordingHandle::new(id, name);
        let mut rng = StdRng::seed_from_u64(u64::from(id));
        context.handle_connect(handle.clone(), &mut rng).unwrap();
        handle
    }

    #[test]
    fn test_login_sequence() {
        let context = context_with(LiveConfig::default());
        let first = admit(&context, 1, "first");
        let sent = first.take();

        assert!(matches!(sent[0], ServerPacket::LoginAccept { connection_id: 1, .. }));
        assert!(matches!(sent[1], ServerPacket::UpdateViewPosition { .. }));
        assert!(sent
            .iter()
            .any(|p| matches!(p, ServerPacket::Roster { action: RosterAction::Add, entries } if entries.len() == 1)));
        assert!(matches!(sent.last(), Some(ServerPacket::Chat { .. })));
        assert!(context.presence().with_state(1, |s| s.ready).unwrap());
    }

    #[test]
    fn test_roster_exchange_and_leave() {
        let context = context_with(LiveConfig::default());
        let first = admit(&context, 1, "first");
        admit(&context, 2, "second");

        let sent = first.take();
        assert!(sent.iter().any(|p| matches!(
            p,
            ServerPacket::Roster { action: RosterAction::Add, entries } if entries[0].username == "second"
        )));

        context.disconnect_player(2);
        let sent = first.take();
        assert!(sent
            .iter()
            .any(|p| matches!(p, ServerPacket::Roster { action: RosterAction::Remove, .. })));
        assert!(sent.iter().any(|p| match p {
            ServerPacket::Chat { message } => message.plain_text() == "second has left the library.",
            _ => false,
        }));
    }

    #[test]
    fn test_admission_rules() {
        let banned = offline_uuid("spammer");
        let admin = offline_uuid("librarian");
        let mut live = LiveConfig {
            max_players: 1,
            ..LiveConfig::default()
        };
        live.bans.insert(banned, Some("spam".to_string()));
        live.admins.insert(admin);
        let context = context_with(live);

        assert_eq!(
            context.check_admission("spammer").unwrap(),
            "You have been banned. Reason: spam."
        );
        assert!(context.check_admission("reader").is_none());

        admit(&context, 1, "reader");
        assert_eq!(context.check_admission("another").unwrap(), "Server is full!");
        assert!(context.check_admission("librarian").is_none());
        assert!(context.check_admission("reader").is_some());
    }

    #[test]
    fn test_colorless_viewer_gets_stripped_chat() {
        let context = context_with(LiveConfig::default());
        let handle = admit(&context, 1, "plain");
        context.presence().update_settings(1, 0, false).unwrap();
        handle.take();

        let session = context.presence().session(1).unwrap();
        context.send_error(&session, "nope");
        match &handle.take()[0] {
            ServerPacket::Chat { message } => assert!(message.parts.iter().all(|p| p.color.is_none())),
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_reload_kicks_banned_users() {
        let context = context_with(LiveConfig::default());
        let handle = admit(&context, 1, "reader");

        let mut live = LiveConfig::default();
        live.bans.insert(handle.uuid(), None);
        context.apply_live_config(live);

        assert_eq!(handle.closed.lock().as_deref(), Some("You have been banned."));
    }
}
