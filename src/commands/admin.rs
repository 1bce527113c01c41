//! Commands only admins can run. Anyone else gets the unknown-command answer.

use std::sync::Arc;

use log::info;

use super::player::tp;
use super::{rejected, CommandError, CommandResult};
use crate::chat::{ChatColor, ChatMessage};
use crate::network::ServerContext;
use crate::presence::Session;

fn online(context: &ServerContext, username: &str) -> Result<Arc<Session>, CommandError> {
    context
        .presence()
        .find_by_username(username)
        .ok_or_else(|| rejected("That user is not online."))
}

fn tagged_line(context: &ServerContext, label: &str, sender: &Session, message: &str) -> ChatMessage {
    context
        .name_tag(
            ChatMessage::new().highlighted(format!("[{}] ", label), ChatColor::Red).text("<"),
            &sender.uuid(),
            sender.username(),
        )
        .text(format!("> {}", message))
}

pub(super) fn kick(context: &ServerContext, session: &Session, args: &[&str]) -> CommandResult {
    let Some((username, reason)) = args.split_first() else {
        return Err(rejected("The command takes one or two parameters."));
    };
    let other = online(context, username)?;
    let reason = reason.join(" ");

    info!("{} has kicked {} for {:?}", session.username(), other.username(), reason);
    let mut message = "You have been kicked.".to_string();
    if !reason.is_empty() {
        message.push_str(&format!(" Reason: {}.", reason));
    }
    other.handle().close(&message);
    context.send_chat(session, ChatMessage::plain(format!("{} has been kicked.", username)));
    Ok(())
}

pub(super) fn tp_other(context: &ServerContext, session: &Session, args: &[&str]) -> CommandResult {
    let [username, rest @ ..] = args else {
        return Err(rejected("That command takes two, four, or six parameters."));
    };
    if rest.is_empty() {
        return Err(rejected("That command takes two, four, or six parameters."));
    }
    let other = online(context, username)?;

    info!("{} used /tpother on {}", session.username(), other.username());
    tp(context, &other, session, rest)
}

pub(super) fn announce(context: &ServerContext, session: &Session, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(rejected("That command takes one parameter."));
    }
    let message = args.join(" ");

    info!("{} announced: {:?}", session.username(), message);
    context.broadcast_chat(&tagged_line(context, "ANNOUNCEMENT", session, &message), false);
    Ok(())
}

pub(super) fn tell(context: &ServerContext, session: &Session, args: &[&str]) -> CommandResult {
    let [username, rest @ ..] = args else {
        return Err(rejected("That command takes two parameters."));
    };
    if rest.is_empty() {
        return Err(rejected("That command takes two parameters."));
    }
    let other = online(context, username)?;
    let message = rest.join(" ");

    context.send_chat(&other, tagged_line(context, "DIRECT MESSAGE", session, &message));
    info!("{} told {} {:?}", session.username(), other.username(), message);
    Ok(())
}
