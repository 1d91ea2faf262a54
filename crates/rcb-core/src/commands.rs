//! Chat command parsing and dispatch.

use crate::{
    context::BotContext,
    domain::{BotUserId, Contact, GroupId},
    errors::Error,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Login,
    Logout,
    Search(String),
    Sms,
    Whoami,
    Help,
}

const HELP: &str = "Commands:\n\
- `login`: link your RingCentral account\n\
- `logout`: unlink it\n\
- `whoami`: show the linked account\n\
- `search <name>`: look up a contact\n\
- `sms`: list numbers that can send SMS";

/// Split `"/cmd@bot rest"` into a lowercase command word and the trimmed remainder.
fn split_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

impl BotCommand {
    pub fn parse(text: &str) -> Option<Self> {
        let (cmd, rest) = split_command(text);
        match cmd.as_str() {
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "search" | "find" if !rest.is_empty() => Some(Self::Search(rest)),
            "sms" => Some(Self::Sms),
            "whoami" | "me" => Some(Self::Whoami),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Parse and run a chat message. Returns `false` when the text is not a command.
pub async fn handle_text(
    ctx: &BotContext,
    user: &BotUserId,
    group: &GroupId,
    text: &str,
) -> Result<bool> {
    let Some(cmd) = BotCommand::parse(text) else {
        return Ok(false);
    };
    tracing::debug!(user = %user, group = %group, ?cmd, "dispatching command");
    dispatch(ctx, user, group, cmd).await?;
    Ok(true)
}

pub async fn dispatch(
    ctx: &BotContext,
    user: &BotUserId,
    group: &GroupId,
    cmd: BotCommand,
) -> Result<()> {
    let needs_login = matches!(
        cmd,
        BotCommand::Search(_) | BotCommand::Sms | BotCommand::Whoami
    );
    if needs_login && !logged_in(ctx, user).await {
        return ctx
            .chat
            .send_message(group, &Error::NotAuthenticated.user_message())
            .await;
    }

    let reply = match cmd {
        BotCommand::Login => {
            ctx.oauth.initiate_login(user, group).await?;
            return Ok(());
        }
        BotCommand::Logout => {
            ctx.oauth.logout(user, group).await?;
            return Ok(());
        }
        BotCommand::Help => HELP.to_string(),
        BotCommand::Search(name) => {
            let contacts = ctx.directory.search_contacts(user, &name).await?;
            format_contacts(&name, &contacts)
        }
        BotCommand::Sms => {
            let numbers = ctx.directory.sms_capable_numbers(user).await?;
            if numbers.is_empty() {
                "No SMS-capable numbers on your account.".to_string()
            } else {
                let lines = numbers
                    .iter()
                    .map(|n| format!("- {}", n.phone_number))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("SMS-capable numbers:\n{lines}")
            }
        }
        BotCommand::Whoami => {
            let id = ctx.identities.identity(user).await?;
            format!(
                "{} You are logged in as {}({}, {}).",
                ctx.chat.mention(user),
                id.name,
                id.extension_number,
                id.email
            )
        }
    };
    ctx.chat.send_message(group, &reply).await
}

/// Directory commands need a live token; without one a failed fetch would be cached
/// as an empty listing.
async fn logged_in(ctx: &BotContext, user: &BotUserId) -> bool {
    ctx.sessions
        .get_or_create(user)
        .client()
        .has_valid_token()
        .await
}

fn format_contacts(name: &str, contacts: &[Contact]) -> String {
    if contacts.is_empty() {
        return format!("No contacts found for \"{name}\".");
    }
    let lines = contacts
        .iter()
        .map(|c| {
            format!(
                "- {}: {}",
                c.name.trim(),
                c.phone_number.as_deref().unwrap_or("no number")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Contacts matching \"{name}\":\n{lines}")
}
