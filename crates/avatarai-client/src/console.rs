//! Line-oriented front end for the `avatarai` binary.
//!
//! Lines starting with `/` are commands, anything else is a chat message.
//! UI events are printed one per line on stdout; logs go to stderr.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use avatarai_shared::mcp::InstallForm;

use crate::app::AppCommand;
use crate::components::chat::{ChatEntry, ChatRole, EntryBody};
use crate::events::{AuthView, ToastLevel, UiEvent};

pub const HELP: &str = "\
Commands:
  /login [handle]          sign in (without a handle: show the login form)
  /code <code>             finish sign-in with the OAuth callback code
  /logout                  sign out
  /history                 reload the chat history
  /image <path>            send an image to the assistant
  /interrupt               stop the current response
  /feed                    reload the feed
  /more                    load the next feed page
  /attach <path>...        attach images to the next post
  /video <path>            attach a video to the next post
  /link <url>              attach a link to the next post
  /clear                   drop the staged attachments
  /post <text>             publish a post
  /reply <moment-id>       toggle the reply form
  /reply <moment-id> <text> publish a reply
  /thread <uri>            open a thread
  /profile                 start editing the profile
  /avatar <path>           stage a new avatar
  /banner <path>           stage a new banner
  /save <name> | <bio>     save the profile
  /mcp                     list MCP servers
  /mcp show|auth|on|off|sync|nosync|rm <id>
  /mcp add <name> stdio <command> [args...]
  /mcp add <name> <sse|streamableHttp> <url>
  /quit                    exit
  <text>                   chat with the assistant";

/// What a console line asks for.
#[derive(Debug, Clone)]
pub enum ConsoleInput {
    Command(AppCommand),
    Help,
    Empty,
}

/// Parse one input line. Unknown commands and missing arguments are
/// reported as the message to print.
pub fn parse_line(line: &str) -> Result<ConsoleInput, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleInput::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(ConsoleInput::Command(AppCommand::SendText(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let required = |what: &str| -> Result<String, String> {
        if args.is_empty() {
            Err(format!("/{name} needs {what}"))
        } else {
            Ok(args.to_string())
        }
    };

    let command = match name {
        "help" | "?" => return Ok(ConsoleInput::Help),
        "quit" | "exit" => AppCommand::Shutdown,
        "login" if args.is_empty() => AppCommand::ShowLogin,
        "login" => AppCommand::Login {
            username: args.to_string(),
        },
        "code" => AppCommand::OAuthCode(required("a code")?),
        "logout" => AppCommand::Logout,
        "history" => AppCommand::LoadHistory,
        "image" => AppCommand::SendImage(PathBuf::from(required("a file path")?)),
        "interrupt" => AppCommand::Interrupt,
        "feed" => AppCommand::LoadFeed,
        "more" => AppCommand::LoadMore,
        "attach" => {
            required("at least one file path")?;
            AppCommand::AttachImages(args.split_whitespace().map(PathBuf::from).collect())
        }
        "video" => AppCommand::AttachVideo(PathBuf::from(required("a file path")?)),
        "link" => AppCommand::AttachLink(required("a URL")?),
        "clear" => AppCommand::ClearAttachments,
        "post" => AppCommand::Post(args.to_string()),
        "reply" => {
            let args = required("a moment id")?;
            match args.split_once(char::is_whitespace) {
                Some((id, text)) => AppCommand::Reply {
                    moment_id: id.to_string(),
                    text: text.trim().to_string(),
                },
                None => AppCommand::ToggleReply(args),
            }
        }
        "thread" => AppCommand::OpenThread(required("a moment uri")?),
        "profile" => AppCommand::EditProfile,
        "avatar" => AppCommand::StageAvatar(PathBuf::from(required("a file path")?)),
        "banner" => AppCommand::StageBanner(PathBuf::from(required("a file path")?)),
        "save" => {
            let (display_name, description) = args.split_once('|').unwrap_or((args, ""));
            AppCommand::SaveProfile {
                display_name: display_name.trim().to_string(),
                description: description.trim().to_string(),
            }
        }
        "mcp" => parse_mcp(args)?,
        other => return Err(format!("Unknown command /{other}, try /help")),
    };
    Ok(ConsoleInput::Command(command))
}

fn parse_mcp(args: &str) -> Result<AppCommand, String> {
    let mut words = args.split_whitespace();
    let Some(action) = words.next() else {
        return Ok(AppCommand::McpList);
    };
    if action == "add" {
        return parse_mcp_install(words.collect());
    }
    let id = words
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("/mcp {action} needs a server id"))?;

    Ok(match action {
        "show" => AppCommand::McpDetail(id),
        "auth" => AppCommand::McpAuthorize(id),
        "on" => AppCommand::McpToggle { mcp_id: id, enabled: true },
        "off" => AppCommand::McpToggle { mcp_id: id, enabled: false },
        "sync" => AppCommand::McpSync { mcp_id: id, sync: true },
        "nosync" => AppCommand::McpSync { mcp_id: id, sync: false },
        "rm" => AppCommand::McpUninstall(id),
        other => return Err(format!("Unknown /mcp action '{other}'")),
    })
}

fn parse_mcp_install(words: Vec<&str>) -> Result<AppCommand, String> {
    let [name, endpoint_type, target, rest @ ..] = words.as_slice() else {
        return Err("/mcp add needs a name, an endpoint type and a command or URL".into());
    };
    let mut form = InstallForm {
        name: name.to_string(),
        endpoint_type: endpoint_type.to_string(),
        ..Default::default()
    };
    if *endpoint_type == "stdio" {
        form.command = target.to_string();
        form.args = rest.join("\n");
    } else {
        form.url = target.to_string();
    }
    Ok(AppCommand::McpInstall(form))
}

/// Read stdin until EOF, forwarding commands to the shell.
pub async fn read_commands(commands: mpsc::UnboundedSender<AppCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        };
        match parse_line(&line) {
            Ok(ConsoleInput::Command(command)) => {
                let stop = matches!(command, AppCommand::Shutdown);
                if commands.send(command).is_err() || stop {
                    return;
                }
            }
            Ok(ConsoleInput::Help) => println!("{HELP}"),
            Ok(ConsoleInput::Empty) => {}
            Err(message) => println!("! {message}"),
        }
    }
    debug!("stdin closed");
    let _ = commands.send(AppCommand::Shutdown);
}

/// Print UI events until the sink is dropped.
pub async fn print_events(mut events: mpsc::UnboundedReceiver<UiEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = describe(&event) {
            println!("{line}");
        }
    }
}

/// One-line rendering of an event. Streaming updates print only the
/// finished text; partial updates would flood the terminal.
pub fn describe(event: &UiEvent) -> Option<String> {
    let line = match event {
        UiEvent::Toast { level, message } => {
            let tag = match level {
                ToastLevel::Success => "ok",
                ToastLevel::Info => "info",
                ToastLevel::Warning => "warn",
                ToastLevel::Error => "error",
            };
            format!("[{tag}] {message}")
        }
        UiEvent::Auth(AuthView::Welcome) => "Welcome! Type /login <handle> to sign in.".into(),
        UiEvent::Auth(AuthView::LoginForm) => "Enter /login <handle> to continue.".into(),
        UiEvent::Auth(AuthView::Redirect(url)) => {
            format!("Open this URL to sign in, then paste the code with /code: {url}")
        }
        UiEvent::Auth(AuthView::UserPanel(user)) => format!("Signed in as {} (@{})", user.name(), user.handle),
        UiEvent::Connection { status, .. } => format!("-- chat {}", status.as_str()),
        UiEvent::InterruptVisible(true) => "-- assistant is responding (/interrupt to stop)".into(),
        UiEvent::InterruptVisible(false) => return None,
        UiEvent::ChatEntryAdded(entry) => return entry_line(entry),
        UiEvent::ChatEntryRemoved(_) => return None,
        UiEvent::ChatHistoryLoaded(entries) => entries
            .iter()
            .filter_map(entry_line)
            .collect::<Vec<_>>()
            .join("\n"),
        UiEvent::StreamingUpdated(message) => {
            if !message.status.is_final() {
                return None;
            }
            match &message.notice {
                Some(notice) => format!("assistant: {} [{notice}]", message.text()),
                None => format!("assistant: {}", message.text()),
            }
        }
        UiEvent::FeedUpdated { cards, has_more } => {
            let mut lines: Vec<String> = cards
                .iter()
                .map(|c| format!("  {} @{}: {}", c.moment.id, c.moment.author.handle, c.moment.text))
                .collect();
            if *has_more {
                lines.push("  (/more for older moments)".into());
            }
            format!("Feed:\n{}", lines.join("\n"))
        }
        UiEvent::ReplyFormToggled { moment_id, open } => {
            if *open {
                format!("Replying to {moment_id}: /reply {moment_id} <text>")
            } else {
                return None;
            }
        }
        UiEvent::ThreadLoaded { root, rows } => {
            let mut lines = Vec::new();
            if let Some(root) = root {
                lines.push(format!("@{}: {}", root.moment.author.handle, root.moment.text));
            }
            for row in rows {
                lines.push(format!(
                    "{}@{}: {}",
                    "  ".repeat(row.depth),
                    row.card.moment.author.handle,
                    row.card.moment.text
                ));
            }
            lines.join("\n")
        }
        UiEvent::CharCounter { .. } => return None,
        UiEvent::ProfileUpdated(user) => format!("Profile: {} ({})", user.name(), user.did),
        UiEvent::McpServers(servers) => servers
            .iter()
            .map(|s| {
                format!(
                    "  {} {} [{}] auth: {} / {}",
                    s.mcp_id,
                    s.name,
                    s.status,
                    s.authorization.method_label(),
                    s.authorization.status_label()
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        UiEvent::McpServerDetail(server) => format!(
            "{} ({}): {}",
            server.name,
            server.mcp_id,
            server.description.as_deref().unwrap_or("")
        ),
        UiEvent::McpAuthorizeRedirect(url) => format!("Open this URL to authorize: {url}"),
    };
    Some(line)
}

fn entry_line(entry: &ChatEntry) -> Option<String> {
    let who = match entry.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
    };
    match &entry.body {
        EntryBody::Text(text) => Some(format!("{who}: {text}")),
        EntryBody::Image { url, alt } => Some(format!("{who}: [image {alt}] {url}")),
        EntryBody::Streaming(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> AppCommand {
        match parse_line(line) {
            Ok(ConsoleInput::Command(command)) => command,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_chat() {
        assert!(matches!(command("  hello there "), AppCommand::SendText(t) if t == "hello there"));
        assert!(matches!(parse_line("   "), Ok(ConsoleInput::Empty)));
    }

    #[test]
    fn login_with_and_without_handle() {
        assert!(matches!(command("/login"), AppCommand::ShowLogin));
        assert!(matches!(command("/login me.test"), AppCommand::Login { username } if username == "me.test"));
        assert!(matches!(command("/code abc"), AppCommand::OAuthCode(c) if c == "abc"));
        assert_eq!(parse_line("/code").unwrap_err(), "/code needs a code");
    }

    #[test]
    fn reply_toggles_or_posts() {
        assert!(matches!(command("/reply m1"), AppCommand::ToggleReply(id) if id == "m1"));
        assert!(matches!(
            command("/reply m1 nice one"),
            AppCommand::Reply { moment_id, text } if moment_id == "m1" && text == "nice one"
        ));
    }

    #[test]
    fn profile_save_splits_on_bar() {
        assert!(matches!(
            command("/save New Name | likes rust"),
            AppCommand::SaveProfile { display_name, description }
                if display_name == "New Name" && description == "likes rust"
        ));
    }

    #[test]
    fn mcp_subcommands() {
        assert!(matches!(command("/mcp"), AppCommand::McpList));
        assert!(matches!(
            command("/mcp off m1"),
            AppCommand::McpToggle { mcp_id, enabled: false } if mcp_id == "m1"
        ));
        let AppCommand::McpInstall(form) = command("/mcp add files stdio npx -y @mcp/fs") else {
            panic!("expected install");
        };
        assert_eq!(form.command, "npx");
        assert_eq!(form.args, "-y\n@mcp/fs");
        assert!(parse_line("/mcp on").is_err());
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(parse_line("/dance").unwrap_err(), "Unknown command /dance, try /help");
    }

    #[test]
    fn toasts_are_tagged() {
        let line = describe(&UiEvent::Toast {
            level: ToastLevel::Error,
            message: "boom".into(),
        });
        assert_eq!(line.as_deref(), Some("[error] boom"));
        assert_eq!(describe(&UiEvent::InterruptVisible(false)), None);
    }
}
