//! Inbound packet handling for logged-in connections

use std::sync::Arc;

use log::{debug, info};

use super::packet::{ClientPacket, Hand, ServerPacket};
use super::protocol::Protocol;
use super::server::ServerContext;
use crate::chat::{ChatColor, ChatMessage, ChatPart, ClickAction};
use crate::commands;
use crate::error::LibraryResult;
use crate::library::container_books;
use crate::presence::{Session, ShelfSelection};
use crate::world::BlockPos;

/// Route one packet to its handler
pub fn handle_packet(context: &ServerContext, session: &Arc<Session>, packet: ClientPacket) -> LibraryResult<()> {
    context.note_packet(session, &packet);
    let id = session.id();

    match packet {
        ClientPacket::Position {
            coords,
            yaw,
            pitch,
            on_ground,
        } => {
            context.presence().on_position_update(id, coords, yaw, pitch, on_ground)?;
        }
        ClientPacket::Look { yaw, pitch, on_ground } => {
            context.presence().on_look(id, yaw, pitch, on_ground)?;
        }
        ClientPacket::UseBlock { location, hand } => handle_use_block(context, session, location, hand),
        ClientPacket::ContainerClick { slot } => handle_container_click(context, session, slot)?,
        ClientPacket::Chat { message } => handle_chat(context, session, &message),
        ClientPacket::TeleportConfirm { teleport_id } => {
            context.presence().confirm_teleport(id, teleport_id)?;
        }
        ClientPacket::Settings {
            skin_parts,
            chat_colors,
        } => {
            context.presence().update_settings(id, skin_parts, chat_colors)?;
        }
        ClientPacket::Login { .. } => {
            debug!("{} sent a second login; ignoring", session.username());
        }
        // the connection loop closes the socket
        ClientPacket::Disconnect { .. } => {}
    }

    Ok(())
}

/// Right click on a block: shelves open the container chooser
fn handle_use_block(context: &ServerContext, session: &Session, location: BlockPos, hand: Hand) {
    // sent once per hand
    if hand != Hand::Main {
        return;
    }

    let geometry = context.presence().geometry();
    let Some(shelf) = geometry.shelf_at(location) else {
        return;
    };
    let Some(chunk) = geometry.library_chunk_of_block(location) else {
        return;
    };

    session.state().selection = Some(ShelfSelection { chunk, shelf });
    session.send(ServerPacket::OpenShelf {
        shelf,
        slots: geometry.slots_per_container,
    });
}

/// Pick a container on the open shelf and hand over its books
fn handle_container_click(context: &ServerContext, session: &Session, slot: i32) -> LibraryResult<()> {
    let slots = context.presence().geometry().slots_per_container;
    let selection = {
        let mut state = session.state();
        if state.selection.is_none() || slot < 0 || slot as u32 >= slots {
            return Ok(());
        }
        state.selection.take()
    };
    let Some(ShelfSelection { chunk, shelf }) = selection else {
        return Ok(());
    };

    let shulker = slot as u32;
    let books = container_books(context.codec(), chunk, shelf, shulker)?;
    session.send(ServerPacket::OpenContainer {
        chunk,
        shelf,
        shulker,
        books,
    });
    Ok(())
}

fn handle_chat(context: &ServerContext, session: &Session, message: &str) {
    if let Err(reason) = Protocol::validate_chat_message(message) {
        debug!("Rejected chat from {}: {}", session.username(), reason);
        context.send_error(session, reason);
        return;
    }

    if let Some(line) = message.strip_prefix('/') {
        commands::dispatch(context, session, line);
        return;
    }

    let chat_enabled = session.state().chat_enabled;
    if !chat_enabled {
        let reminder = ChatMessage::new()
            .text("Chat is currently ")
            .highlighted("OFF", ChatColor::LightPurple)
            .text(". Type ")
            .push(
                ChatPart::new("/togglechat")
                    .color(ChatColor::LightPurple)
                    .bold()
                    .on_click(ClickAction::SuggestCommand("/togglechat".to_string())),
            )
            .text(" to enable it.");
        context.send_chat(session, reminder);
        return;
    }

    let live = context.live();
    if let Some(reason) = live.mute_reason(&session.uuid()) {
        let mut notice = ChatMessage::new().highlighted("You have been muted.", ChatColor::Red);
        if let Some(reason) = reason {
            notice = notice.text(format!(" Reason: {}.", reason));
        }
        context.send_chat(session, notice);
        return;
    }

    info!("<{}> {}", session.username(), message);
    let line = context
        .name_tag(ChatMessage::new().text("<"), &session.uuid(), session.username())
        .text(format!("> {}", message));
    context.broadcast_chat(&line, true);
    session.state().push_recent_message(message);
}
