//! Request dispatch
//!
//! Routes a [`ClientRequest`] by its bus path: the manager base path
//! accepts management operations, `<base>/<name>` accepts session
//! operations. Every failure carries a stable `kind` string clients can
//! match on without parsing messages.

use std::sync::Arc;

use serde_json::json;

use ircbus_core::{BusPath, CommandError, Manager, ManagerError, Session};

use crate::protocol::{ClientRequest, RequestOp, ServerMessage};

fn manager_fail_kind(error: &ManagerError) -> &'static str {
    match error {
        ManagerError::BadName(_) => "bad_name",
        ManagerError::AlreadyExists(_) => "already_exists",
        ManagerError::NotLoaded(_) => "not_loaded",
        ManagerError::Config { .. } => "config_error",
        ManagerError::LoadError { .. } => "load_error",
    }
}

fn command_fail_kind(error: &CommandError) -> &'static str {
    match error {
        CommandError::NotOnChannel(_) => "not_on_channel",
        CommandError::UserNotOnChannel { .. } => "user_not_on_channel",
        CommandError::AlreadyOnChannel(_) => "already_on_channel",
    }
}

fn reply(id: u64) -> ServerMessage {
    ServerMessage::Reply { id, value: None }
}

fn reply_value(id: u64, value: serde_json::Value) -> ServerMessage {
    ServerMessage::Reply {
        id,
        value: Some(value),
    }
}

fn fail(id: u64, kind: &str, message: impl ToString) -> ServerMessage {
    ServerMessage::Fail {
        id,
        kind: kind.to_string(),
        message: message.to_string(),
    }
}

enum Target {
    Management,
    Session(String),
}

/// Resolve the bus path a request addresses against the manager's base
/// path.
fn resolve(base: &BusPath, path: &str) -> Result<Target, String> {
    let path = BusPath::parse(path).map_err(|e| e.to_string())?;
    if path == *base {
        return Ok(Target::Management);
    }

    let base_components = base.components();
    let components = path.components();
    if components.len() == base_components.len() + 1 && components.starts_with(&base_components) {
        let name = components[components.len() - 1];
        return Ok(Target::Session(name.to_string()));
    }

    Err(format!("no object at {path}"))
}

/// Handle one request, producing exactly one response line.
pub async fn dispatch(manager: &Arc<Manager>, request: ClientRequest) -> ServerMessage {
    let id = request.id;

    let target = match resolve(manager.base_path(), &request.path) {
        Ok(target) => target,
        Err(message) => return fail(id, "bad_path", message),
    };

    match target {
        Target::Management => dispatch_management(manager, id, request.op).await,
        Target::Session(name) => {
            let Some(session) = manager.session(&name) else {
                return fail(id, "not_loaded", format!("session not loaded: {name}"));
            };
            dispatch_session(&session, id, request.op).await
        }
    }
}

async fn dispatch_management(manager: &Arc<Manager>, id: u64, op: RequestOp) -> ServerMessage {
    match op {
        RequestOp::ListSessions => reply_value(id, json!(manager.session_names())),
        RequestOp::LoadSession { name } => match manager.start(&name).await {
            Ok(()) => reply(id),
            Err(e) => fail(id, manager_fail_kind(&e), e),
        },
        RequestOp::StopSession { name } => match manager.stop(&name).await {
            Ok(()) => reply(id),
            Err(e) => fail(id, manager_fail_kind(&e), e),
        },
        RequestOp::Shutdown => {
            manager.shutdown().await;
            reply(id)
        }
        _ => fail(id, "bad_op", "not a management operation"),
    }
}

async fn dispatch_session(session: &Arc<Session>, id: u64, op: RequestOp) -> ServerMessage {
    let result = match op {
        RequestOp::JoinChannel { channel, key } => {
            session.join_channel(&channel, key.as_deref()).await
        }
        RequestOp::PartChannel { channel, message } => {
            session.part_channel(&channel, message.as_deref()).await
        }
        RequestOp::SendMessage { dest, text } => session.send_message(&dest, &text).await,
        RequestOp::SendAction { dest, text } => session.send_action(&dest, &text).await,
        RequestOp::SendNotice { dest, text } => session.send_notice(&dest, &text).await,
        RequestOp::Kick {
            channel,
            user,
            reason,
        } => session.kick(&channel, &user, reason.as_deref()).await,
        RequestOp::ChangeMode { target, mode } => session.change_mode(&target, &mode).await,
        RequestOp::ChangeTopic { target, text } => session.change_topic(&target, &text).await,
        RequestOp::Quit { message } => {
            session.quit(message.as_deref()).await;
            Ok(())
        }

        RequestOp::Nick => return reply_value(id, json!(session.nick())),
        RequestOp::ListChannelNames => return reply_value(id, json!(session.channel_names())),
        RequestOp::ListChannelMembers { channel } => {
            return match session.channel_members(&channel) {
                Ok(members) => reply_value(id, json!(members)),
                Err(e) => fail(id, command_fail_kind(&e), e),
            };
        }
        RequestOp::ChannelMode { channel } => {
            return match session.channel_mode(&channel).await {
                Ok(mode) => reply_value(id, json!(mode)),
                Err(e) => fail(id, command_fail_kind(&e), e),
            };
        }
        RequestOp::IsMember { channel, user } => {
            return match session.is_member(&channel, &user) {
                Ok(member) => reply_value(id, json!(member)),
                Err(e) => fail(id, command_fail_kind(&e), e),
            };
        }
        RequestOp::HasPrivilege {
            channel,
            user,
            tier,
        } => {
            return match session.has_privilege(&channel, &user, tier) {
                Ok(has) => reply_value(id, json!(has)),
                Err(e) => fail(id, command_fail_kind(&e), e),
            };
        }
        RequestOp::IsPrivileged { channel, user } => {
            return match session.is_privileged(&channel, &user) {
                Ok(privileged) => reply_value(id, json!(privileged)),
                Err(e) => fail(id, command_fail_kind(&e), e),
            };
        }

        _ => return fail(id, "bad_op", "not a session operation"),
    };

    match result {
        Ok(()) => reply(id),
        Err(e) => fail(id, command_fail_kind(&e), e),
    }
}
