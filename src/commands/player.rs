use log::{error, info, warn};
use tokio::runtime::Handle;

use super::parse::{parse_point, parse_position};
use super::{group_thousands, position_of, rejected, CommandResult};
use crate::chat::{ChatColor, ChatMessage, ClickAction};
use crate::error::LibraryError;
use crate::library::{resolve_search, Address, SearchMode};
use crate::network::{format_report, ServerContext, ServerPacket};
use crate::presence::Session;

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

/// Usage line and its description
fn usage(message: ChatMessage, syntax: &str, description: &str) -> ChatMessage {
    message
        .colored(syntax, ChatColor::Yellow)
        .colored(format!("\n    {}\n", description), ChatColor::Gray)
}

pub(super) fn help(context: &ServerContext, session: &Session, admin: bool) -> CommandResult {
    let mut message = ChatMessage::new().highlighted("=== Library of Babel - Commands ===\n", ChatColor::LightPurple);
    for (syntax, description) in [
        ("/tp <username> | (<x> <y> <z> [<yaw> <pitch>])", "Teleport to a player or coordinates."),
        ("/search (\"exact\" | \"fill\") <text>", "Search for specific text. May contain spaces."),
        ("/nearbysearch", "Search for text nearby (website link)."),
        ("/highlight (<shelf> [<nearX> <nearY> <nearZ>]) | \"stop\"", "Highlight a shelf near you or near coordinates."),
        ("/togglechat", "Toggle chat on and off."),
        ("/toggleplayers", "Toggle other player visibility on and off."),
        ("/report <username> [<reason>]", "Report a player for abuse."),
        ("/clear", "Clear your inventory."),
    ] {
        message = usage(message, syntax, description);
    }
    context.send_chat(session, message);

    if admin {
        let mut message = ChatMessage::new().highlighted("=== Admin Commands ===\n", ChatColor::LightPurple);
        for (syntax, description) in [
            ("/kick <username> [<reason>]", "Kick a player."),
            ("/tpother <username> </tp parameters>", "Execute a tp command as another player."),
            ("/announce <message>", "Make an announcement bypassing chat toggle."),
            ("/tell <username> <message>", "Send a direct message to a player, bypassing chat toggle."),
        ] {
            message = usage(message, syntax, description);
        }
        context.send_chat(session, message);
    }
    Ok(())
}

/// Move `target` to a user or to coordinates. Errors go to whoever ran the command.
pub(super) fn tp(context: &ServerContext, target: &Session, caller: &Session, args: &[&str]) -> CommandResult {
    let destination = match args {
        [username] => {
            if *username == target.username() {
                return Err(rejected("You cannot tp to yourself."));
            }
            let other = context
                .presence()
                .find_by_username(username)
                .ok_or_else(|| rejected("That player is not online."))?;
            let destination = position_of(&other)?;
            info!("{} teleported to {}", target.username(), other.username());
            destination
        }
        _ if args.len() == 3 || args.len() == 5 => {
            let destination = parse_position(args, &position_of(target)?)?;
            if context.presence().geometry().library_chunk_of(destination.coords).is_none() {
                return Err(rejected("Those coordinates are outside the library."));
            }
            info!(
                "{} teleported to {}, {}, {}",
                target.username(),
                destination.coords.x,
                destination.coords.y,
                destination.coords.z
            );
            destination
        }
        _ => return Err(rejected("That command takes one, three, or five parameters.")),
    };

    if target.id() != caller.id() {
        info!("{} moved {}", caller.username(), target.username());
    }
    context.presence().teleport(target.id(), destination)?;
    Ok(())
}

pub(super) fn search(context: &ServerContext, session: &Session, args: &[&str]) -> CommandResult {
    let (mode, words) = match args.split_first() {
        Some((mode, words)) => (mode.parse::<SearchMode>()?, words),
        None => return Err(rejected("Search mode must be either \"fill\" or \"exact\".")),
    };
    let query = words.join(" ");
    if query.chars().all(|c| c == ' ') {
        context.send_notice(session, "Your search text was empty.");
    }

    let codec = context.codec();
    let result = resolve_search(codec, &query, mode, &mut rand::thread_rng())?;
    match mode {
        SearchMode::Fill => info!(
            "{} searched with fill for {:?} ({:?})",
            session.username(),
            result.query,
            result.text
        ),
        SearchMode::Exact => info!("{} searched for {:?}", session.username(), result.query),
    }

    let address = result.address;
    let geometry = codec.geometry();
    let shelf_block = codec.display_coordinates(&address)?;
    let viewpoint = geometry.shelf_viewpoint(address.chunk, address.shelf)?;
    let root = geometry.chunk_root(address.chunk);

    let mut message = ChatMessage::new()
        .highlighted("=== Search Results ===\n", ChatColor::LightPurple)
        .text("That text was found at ")
        .highlighted(
            format!(
                "x={} y={} z={}",
                group_thousands(shelf_block.x),
                group_thousands(shelf_block.y),
                group_thousands(shelf_block.z)
            ),
            ChatColor::Red,
        )
        .text(".\nIn ")
        .highlighted(format!("shelf {}", address.shelf + 1), ChatColor::Yellow)
        .text(", ")
        .highlighted(format!("shulker {}", address.shulker + 1), ChatColor::Green)
        .text(", ")
        .highlighted(format!("book {}", address.book + 1), ChatColor::Blue)
        .text(", ")
        .highlighted(format!("page {}", address.page + 1), ChatColor::LightPurple)
        .text(".\n\nActions: ")
        .action(
            "[Teleport Nearby]",
            ClickAction::RunCommand(format!(
                "/tp {} {} {} {} {}",
                viewpoint.coords.x, viewpoint.coords.y, viewpoint.coords.z, viewpoint.yaw, viewpoint.pitch
            )),
        )
        .text(" ")
        .action(
            "[Highlight Shelf]",
            ClickAction::RunCommand(format!(
                "/highlight {} {} {} {}",
                address.shelf + 1,
                root.x,
                root.y,
                root.z
            )),
        );
    if mode == SearchMode::Fill {
        message = message.text(" ").action(
            "[Find Next]",
            ClickAction::RunCommand(format!("/search fill {}", query)),
        );
    }

    context.send_chat(session, message);
    Ok(())
}

pub(super) fn nearby_search(context: &ServerContext, session: &Session) -> CommandResult {
    let coords = position_of(session)?.coords.floor();
    let base = &context.config().nearby_search_url;
    let url = format!("{}?x={}&y={}&z={}", base, coords.x, coords.y, coords.z);

    let message = ChatMessage::new()
        .text("Nearby search tool: ")
        .action(base.as_str(), ClickAction::OpenUrl(url));
    context.send_chat(session, message);
    Ok(())
}

pub(super) fn highlight(context: &ServerContext, session: &Session, args: &[&str]) -> CommandResult {
    let point = match args {
        ["stop"] => {
            context.presence().stop_highlight(session.id())?;
            context.send_chat(session, ChatMessage::plain("Highlighting has been stopped."));
            return Ok(());
        }
        [_] => position_of(session)?.coords,
        [_, near @ ..] if near.len() == 3 => parse_point(near, &position_of(session)?)?,
        _ => return Err(rejected("The command takes one or four parameters.")),
    };

    let geometry = context.presence().geometry();
    let shelf_count = geometry.shelf_count();
    let shelf = match args[0].parse::<u32>() {
        Ok(shelf) if (1..=shelf_count).contains(&shelf) => shelf - 1,
        _ => {
            return Err(rejected(format!(
                "Shelf must be between 1 and {} (inclusive).",
                shelf_count
            )))
        }
    };

    let chunk = geometry
        .library_chunk_of(point)
        .ok_or_else(|| rejected("Those coordinates are outside the library."))?;

    let marker = context
        .presence()
        .start_highlight(session.id(), &Address::new(chunk, shelf, 0, 0, 0))?;
    let at = marker.point.floor();

    let message = ChatMessage::new()
        .highlighted(format!("Shelf {}", shelf + 1), ChatColor::Yellow)
        .text(" (")
        .highlighted(format!("{}, {}, {}", at.x, at.y, at.z), ChatColor::Red)
        .text(") highlighted.\nRun ")
        .action("[/highlight stop]", ClickAction::SuggestCommand("/highlight stop".to_string()))
        .text(" to stop highlighting.");
    context.send_chat(session, message);
    Ok(())
}

pub(super) fn toggle_chat(context: &ServerContext, session: &Session) -> CommandResult {
    let enabled = {
        let mut state = session.state();
        state.chat_enabled = !state.chat_enabled;
        state.chat_enabled
    };

    info!("{} toggled chat {}", session.username(), on_off(enabled));
    context.send_chat(
        session,
        ChatMessage::new()
            .text("Chat has been toggled ")
            .highlighted(on_off(enabled), ChatColor::LightPurple)
            .text("."),
    );
    if enabled {
        context.send_notice(session, "Please be respectful. Abuse will not be tolerated.");
    }
    Ok(())
}

pub(super) fn toggle_players(context: &ServerContext, session: &Session) -> CommandResult {
    let enabled = !session.state().presence_enabled;
    context.presence().set_presence_enabled(session.id(), enabled)?;

    context.send_chat(
        session,
        ChatMessage::new()
            .text("Player visibility has been toggled ")
            .highlighted(on_off(enabled), ChatColor::LightPurple)
            .text("."),
    );
    Ok(())
}

pub(super) fn report(context: &ServerContext, session: &Session, args: &[&str]) -> CommandResult {
    let Some(webhook) = context.report_webhook() else {
        return Err(rejected("Reporting is not enabled on this server."));
    };
    let Some((username, reason)) = args.split_first() else {
        return Err(rejected("The command takes one or two parameters."));
    };
    let reason = reason.join(" ");
    let runtime = Handle::try_current().map_err(|e| LibraryError::ReportDelivery {
        message: e.to_string(),
    })?;

    let content = match context.presence().find_by_username(username) {
        Some(other) => {
            let recent: Vec<String> = other.state().recent_messages.iter().cloned().collect();
            format_report(session.username(), username, Some(other.uuid()), &reason, &recent)
        }
        None => {
            context.send_notice(session, "That player is not online, report will submit anyway.");
            format_report(session.username(), username, None, &reason, &[])
        }
    };

    info!("{} reported {} for {:?}", session.username(), username, reason);
    warn!(target: "babel_library::report", "{}", content);

    let webhook = webhook.clone();
    let handle = session.handle().clone();
    let colors = session.state().chat_colors;
    let reporter = session.username().to_string();
    let username = username.to_string();
    runtime.spawn(async move {
        let message = match webhook.deliver(&content).await {
            Ok(()) => ChatMessage::plain(format!("{} has been successfully reported, thank you.", username)),
            Err(e) => {
                error!("Report from {} was not delivered: {}", reporter, e);
                ChatMessage::error("Error reporting user. Please try again later.")
            }
        };
        let message = if colors { message } else { message.without_colors() };
        handle.send(ServerPacket::Chat { message });
    });
    Ok(())
}

pub(super) fn clear(context: &ServerContext, session: &Session) -> CommandResult {
    session.send(ServerPacket::ClearInventory);
    context.send_chat(session, ChatMessage::plain("Your inventory has been cleared."));
    info!("{} cleared their inventory", session.username());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::commands::dispatch;
    use crate::commands::tests::last_chat;
    use crate::config::{LiveConfig, ServerConfig};
    use crate::network::server::tests::{admit, context_with};
    use crate::network::webhook::tests::webhook_endpoint;
    use crate::network::{ServerContext, ServerPacket};
    use crate::presence::coordinator::tests::RecordingHandle;
    use crate::world::Position;
    use glam::DVec3;

    fn teleport_target(packets: &[ServerPacket]) -> Option<Position> {
        packets.iter().find_map(|packet| match packet {
            ServerPacket::Position { position, .. } => Some(*position),
            _ => None,
        })
    }

    fn click_commands(packets: &[ServerPacket]) -> Vec<String> {
        packets
            .iter()
            .filter_map(|packet| match packet {
                ServerPacket::Chat { message } => Some(message.parts.clone()),
                _ => None,
            })
            .flatten()
            .filter_map(|part| match part.click {
                Some(crate::chat::ClickAction::RunCommand(command)) => Some(command),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tp_to_coordinates_and_users() {
        let context = context_with(LiveConfig::default());
        let a = admit(&context, 1, "alpha");
        admit(&context, 2, "beta");
        let session = context.presence().session(1).unwrap();
        a.take();

        dispatch(&context, &session, "tp 10 20 30");
        let target = teleport_target(&a.take()).unwrap();
        assert_eq!(target.coords, DVec3::new(10.0, 20.0, 30.0));

        dispatch(&context, &session, "tp beta");
        let beta = context.presence().with_state(2, |s| s.position).unwrap().unwrap();
        assert_eq!(teleport_target(&a.take()).unwrap().coords, beta.coords);

        dispatch(&context, &session, "tp alpha");
        assert_eq!(last_chat(&a.take()), "[ERROR] You cannot tp to yourself.");

        dispatch(&context, &session, "tp ghost");
        assert_eq!(last_chat(&a.take()), "[ERROR] That player is not online.");

        dispatch(&context, &session, "tp 1 2");
        assert_eq!(
            last_chat(&a.take()),
            "[ERROR] That command takes one, three, or five parameters."
        );

        dispatch(&context, &session, "tp 1e300 1 1");
        let sent = a.take();
        assert!(teleport_target(&sent).is_none());
        assert_eq!(last_chat(&sent), "[ERROR] Those coordinates are outside the library.");
    }

    #[tokio::test]
    async fn test_search_offers_actions() {
        let context = context_with(LiveConfig::default());
        let handle = admit(&context, 1, "reader");
        let session = context.presence().session(1).unwrap();
        handle.take();

        dispatch(&context, &session, "search exact hello world");
        let sent = handle.take();
        assert!(last_chat(&sent).starts_with("=== Search Results ===\nThat text was found at x="));
        let commands = click_commands(&sent);
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("/tp "));
        assert!(commands[1].starts_with("/highlight "));

        // the highlight action points back at the same shelf
        dispatch(&context, &session, &commands[1][1..]);
        assert!(last_chat(&handle.take()).contains("highlighted."));
        assert!(session.state().highlight.is_some());

        dispatch(&context, &session, "search fill babel");
        let commands = click_commands(&handle.take());
        assert_eq!(commands.last().map(String::as_str), Some("/search fill babel"));
    }

    #[test]
    fn test_highlight_argument_checks() {
        let context = context_with(LiveConfig::default());
        let handle = admit(&context, 1, "reader");
        let session = context.presence().session(1).unwrap();
        handle.take();

        dispatch(&context, &session, "highlight 0");
        assert_eq!(last_chat(&handle.take()), "[ERROR] Shelf must be between 1 and 81 (inclusive).");

        dispatch(&context, &session, "highlight 3 1 2");
        assert_eq!(last_chat(&handle.take()), "[ERROR] The command takes one or four parameters.");

        dispatch(&context, &session, "highlight stop");
        assert_eq!(last_chat(&handle.take()), "Highlighting has been stopped.");

        // 2^36 blocks east must not wrap back onto the origin chunk
        dispatch(&context, &session, "highlight 1 68719476736 0 0");
        assert_eq!(last_chat(&handle.take()), "[ERROR] Those coordinates are outside the library.");
        assert!(session.state().highlight.is_none());
    }

    #[test]
    fn test_toggles() {
        let context = context_with(LiveConfig::default());
        let handle = admit(&context, 1, "reader");
        let session = context.presence().session(1).unwrap();
        handle.take();

        dispatch(&context, &session, "togglechat");
        assert!(!session.state().chat_enabled);
        assert_eq!(last_chat(&handle.take()), "Chat has been toggled OFF.");

        dispatch(&context, &session, "togglechat");
        assert_eq!(
            last_chat(&handle.take()),
            "[NOTICE] Please be respectful. Abuse will not be tolerated."
        );

        dispatch(&context, &session, "toggleplayers");
        assert!(!session.state().presence_enabled);
        assert_eq!(last_chat(&handle.take()), "Player visibility has been toggled OFF.");
    }

    /// Wait for the next chat line a spawned task sends
    async fn next_chat(handle: &RecordingHandle) -> String {
        for _ in 0..500 {
            let sent = handle.take();
            if sent.iter().any(|p| matches!(p, ServerPacket::Chat { .. })) {
                return last_chat(&sent);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no chat line arrived");
    }

    fn reporting_context(url: String) -> Arc<ServerContext> {
        let config = ServerConfig {
            report_webhook_url: Some(url),
            ..ServerConfig::default()
        };
        ServerContext::new(config, LiveConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_report_is_posted_to_webhook() {
        let (url, endpoint) = webhook_endpoint(204).await;
        let context = reporting_context(url);
        let handle = admit(&context, 1, "reader");
        let vandal = admit(&context, 2, "vandal");
        context
            .presence()
            .with_state(2, |s| s.push_recent_message("buy now"))
            .unwrap();
        let session = context.presence().session(1).unwrap();
        handle.take();
        vandal.take();

        dispatch(&context, &session, "report vandal being rude");
        assert_eq!(next_chat(&handle).await, "vandal has been successfully reported, thank you.");

        let body: serde_json::Value = serde_json::from_str(&endpoint.await.unwrap()).unwrap();
        let content = body["content"].as_str().unwrap();
        assert!(content.starts_with("**reader** reported **vandal**"));
        assert!(content.contains("for \"being rude\""));
        assert!(content.contains("- \"buy now\""));
    }

    #[tokio::test]
    async fn test_failed_report_tells_reporter() {
        let (url, endpoint) = webhook_endpoint(500).await;
        let context = reporting_context(url);
        let handle = admit(&context, 1, "reader");
        let session = context.presence().session(1).unwrap();
        handle.take();

        dispatch(&context, &session, "report ghost");
        // offline target: notice first, delivery result later
        assert_eq!(
            last_chat(&handle.take()),
            "[NOTICE] That player is not online, report will submit anyway."
        );
        assert_eq!(
            next_chat(&handle).await,
            "[ERROR] Error reporting user. Please try again later."
        );
        endpoint.await.unwrap();
    }

    #[test]
    fn test_report_needs_webhook_and_clear() {
        let context = context_with(LiveConfig::default());
        let handle = admit(&context, 1, "reader");
        let session = context.presence().session(1).unwrap();
        handle.take();

        dispatch(&context, &session, "report someone");
        assert_eq!(last_chat(&handle.take()), "[ERROR] Reporting is not enabled on this server.");

        dispatch(&context, &session, "clear");
        let sent = handle.take();
        assert_eq!(sent[0], ServerPacket::ClearInventory);
        assert_eq!(last_chat(&sent), "Your inventory has been cleared.");
    }
}
