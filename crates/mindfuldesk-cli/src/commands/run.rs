//! Interactive driver: events stream to stdout as JSON lines while commands
//! are read from stdin. Every change goes through the running engine, so
//! nothing else writes the settings store while this runs.
//!
//! ```text
//! start [focus|short|long]   pause   resume   toggle   stop
//! override <secs>            end-override
//! blocker enable|disable     blocker mode <warn|block>
//! blocker add <name> <pattern> [website|application]
//! blocker popular <pattern>  blocker remove <id>   blocker toggle <id>
//! blocker override <true|false> [timeout-secs]     blocker check <url>
//! reminder enable|disable    reminder only-during-focus <true|false>
//! reminder toggle <id>       reminder delete <id>
//! reminder interval <id> <minutes>                 reminder message <id> <text>
//! reminder add <minutes> <text>
//! focus <field> <value>      (work, short-break, long-break,
//!                             sessions-before-long-break, auto-start-breaks,
//!                             auto-start-focus, notifications, sound)
//! status                     reload             quit
//! ```

use std::error::Error;
use std::time::Duration;

use mindfuldesk_core::runtime::{self, RuntimeHandle};
use mindfuldesk_core::{
    BlockItemType, BlockerOp, Config, Event, ReminderEdit, ReminderOp, SessionType,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{open_engine, CliResult};

pub fn run(config: &Config) -> CliResult {
    let engine = open_engine(config)?;
    let period = Duration::from_millis(config.runtime.tick_interval_ms);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(session_loop(engine, period))
}

async fn session_loop(engine: mindfuldesk_core::SchedulingEngine, period: Duration) -> CliResult {
    let (handle, mut events, task) = runtime::spawn(engine, period);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(event) = events.recv() => emit(&event)?,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" || line == "exit" {
                    break;
                }
                if let Err(e) = handle_line(&handle, line).await {
                    eprintln!("error: {e}");
                }
            }
        }
    }

    drop(handle);
    task.await?;
    // Events emitted during shutdown.
    while let Ok(event) = events.try_recv() {
        emit(&event)?;
    }
    Ok(())
}

async fn handle_line(handle: &RuntimeHandle, line: &str) -> CliResult {
    let (command, rest) = split_word(line);
    let (arg, _) = split_word(rest);

    match command {
        "start" => {
            let session_type = optional(arg).map(str::parse::<SessionType>).transpose()?;
            reply(&handle.start_session(session_type).await?)
        }
        "pause" => reply(&handle.pause_session().await?),
        "resume" => reply(&handle.resume_session().await?),
        "toggle" => reply(&handle.toggle_pause().await?),
        "stop" => reply(&handle.stop_session().await?),
        "override" => {
            let secs = required(arg, "override <seconds>")?.parse::<u32>()?;
            reply(&handle.request_override(secs).await?)
        }
        "end-override" => reply(&handle.end_override().await?),
        "blocker" => blocker(handle, rest).await,
        "reminder" => reminder(handle, rest).await,
        "focus" => focus(handle, rest).await,
        "reload" => reply(&handle.reload_settings().await?),
        "status" => reply(&handle.snapshot().await?),
        other => Err(format!("unknown command: {other}").into()),
    }
}

async fn blocker(handle: &RuntimeHandle, args: &str) -> CliResult {
    let (action, rest) = split_word(args);
    let (first, tail) = split_word(rest);

    let op = match action {
        "enable" => BlockerOp::SetEnabled(true),
        "disable" => BlockerOp::SetEnabled(false),
        "mode" => BlockerOp::SetMode(required(first, "blocker mode <warn|block>")?.parse()?),
        "add" => {
            let usage = "blocker add <name> <pattern> [website|application]";
            let (pattern, kind) = split_word(tail);
            BlockerOp::AddItem {
                name: required(first, usage)?.to_string(),
                url_pattern: required(pattern, usage)?.to_string(),
                item_type: optional(kind)
                    .map(str::parse::<BlockItemType>)
                    .transpose()?
                    .unwrap_or(BlockItemType::Website),
            }
        }
        "popular" => BlockerOp::AddPopular(required(first, "blocker popular <pattern>")?.into()),
        "remove" => BlockerOp::RemoveItem(required(first, "blocker remove <id>")?.into()),
        "toggle" => BlockerOp::ToggleItem(required(first, "blocker toggle <id>")?.into()),
        "override" => {
            let allow = required(first, "blocker override <true|false> [timeout-secs]")?
                .parse::<bool>()?;
            let timeout_secs = match optional(tail) {
                Some(secs) => secs.parse::<u32>()?,
                None => handle.snapshot().await?.blocker.override_timeout,
            };
            BlockerOp::SetOverridePolicy {
                allow_override: allow,
                timeout_secs,
            }
        }
        "check" => {
            let blocked = handle
                .is_url_blocked(required(first, "blocker check <url>")?)
                .await?;
            return reply(&if blocked { "blocked" } else { "allowed" });
        }
        _ => {
            return Err(
                "usage: blocker enable|disable|mode|add|popular|remove|toggle|override|check"
                    .into(),
            )
        }
    };
    reply(&handle.blocker(op).await?)
}

async fn reminder(handle: &RuntimeHandle, args: &str) -> CliResult {
    let (action, rest) = split_word(args);
    let (first, tail) = split_word(rest);

    let op = match action {
        "enable" => ReminderOp::SetEnabled(true),
        "disable" => ReminderOp::SetEnabled(false),
        "only-during-focus" => ReminderOp::SetOnlyDuringFocus(
            required(first, "reminder only-during-focus <true|false>")?.parse()?,
        ),
        "toggle" => ReminderOp::Toggle(required(first, "reminder toggle <id>")?.into()),
        "delete" => ReminderOp::Delete(required(first, "reminder delete <id>")?.into()),
        "interval" => {
            let usage = "reminder interval <id> <minutes>";
            ReminderOp::Edit {
                id: required(first, usage)?.into(),
                edit: ReminderEdit {
                    interval_minutes: Some(required(tail, usage)?.parse()?),
                    message: None,
                },
            }
        }
        "message" => {
            let usage = "reminder message <id> <text>";
            ReminderOp::Edit {
                id: required(first, usage)?.into(),
                edit: ReminderEdit {
                    interval_minutes: None,
                    message: Some(required(tail, usage)?.into()),
                },
            }
        }
        "add" => {
            let usage = "reminder add <minutes> <text>";
            ReminderOp::AddCustom {
                interval_minutes: required(first, usage)?.parse()?,
                message: required(tail, usage)?.into(),
            }
        }
        _ => {
            return Err(
                "usage: reminder enable|disable|only-during-focus|toggle|delete|interval|message|add"
                    .into(),
            )
        }
    };
    reply(&handle.reminder(op).await?)
}

async fn focus(handle: &RuntimeHandle, args: &str) -> CliResult {
    let usage = "focus <field> <value>";
    let (field, rest) = split_word(args);
    let value = required(rest, usage)?;

    let mut settings = handle.snapshot().await?.focus_settings;
    match required(field, usage)? {
        "work" => settings.work_duration = value.parse()?,
        "short-break" => settings.short_break = value.parse()?,
        "long-break" => settings.long_break = value.parse()?,
        "sessions-before-long-break" => settings.sessions_before_long_break = value.parse()?,
        "auto-start-breaks" => settings.auto_start_breaks = value.parse()?,
        "auto-start-focus" => settings.auto_start_focus = value.parse()?,
        "notifications" => settings.notifications_enabled = value.parse()?,
        "sound" => settings.sound_enabled = value.parse()?,
        other => return Err(format!("unknown focus field: {other}").into()),
    }
    reply(&handle.save_focus_settings(settings).await?)
}

/// First whitespace-separated word and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn optional(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn required<'a>(value: &'a str, usage: &str) -> Result<&'a str, Box<dyn Error>> {
    optional(value).ok_or_else(|| format!("usage: {usage}").into())
}

fn emit(event: &Event) -> CliResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

fn reply<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
