//! Slash commands: the CLI's deterministic layer.
//!
//! `/task <title>`, `/tasks`, `/done <title>`, `/news [tab]`, `/go <view>`
//! and `/theme [light|dark]` resolve without touching the model. A known
//! command with a bad argument is an error; unknown commands and plain text
//! fall through to the semantic layer.

use parlance_core::{NewsTab, RouteContext, StructuredCommand, Theme, View};

pub fn slash_command(
    input: &str,
    _ctx: &RouteContext,
) -> anyhow::Result<Option<StructuredCommand>> {
    let Some(rest) = input.trim().strip_prefix('/') else {
        return Ok(None);
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "task" if arg.is_empty() => StructuredCommand::ListTasks,
        "task" => StructuredCommand::CreateTask {
            title: arg.to_string(),
        },
        "tasks" => StructuredCommand::ListTasks,
        "done" => {
            anyhow::ensure!(!arg.is_empty(), "/done needs a task title");
            StructuredCommand::CompleteTask {
                title: arg.to_string(),
            }
        }
        "news" if arg.is_empty() => StructuredCommand::RefreshNews,
        "news" => StructuredCommand::SwitchNewsTab {
            tab: parse_tab(arg)?,
        },
        "go" => StructuredCommand::Navigate {
            view: parse_view(arg)?,
        },
        "theme" => StructuredCommand::SetTheme {
            theme: parse_theme(arg)?,
        },
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn parse_tab(arg: &str) -> anyhow::Result<NewsTab> {
    let arg = arg.to_lowercase();
    NewsTab::ALL
        .into_iter()
        .find(|tab| tab.as_str() == arg)
        .ok_or_else(|| {
            let known: Vec<&str> = NewsTab::ALL.iter().map(NewsTab::as_str).collect();
            anyhow::anyhow!("unknown news tab {arg:?}, expected one of {}", known.join(", "))
        })
}

pub fn parse_view(arg: &str) -> anyhow::Result<View> {
    match arg.to_lowercase().as_str() {
        "home" => Ok(View::Home),
        "tasks" => Ok(View::Tasks),
        "news" => Ok(View::News),
        "settings" => Ok(View::Settings),
        other => anyhow::bail!("unknown view {other:?}, expected home, tasks, news or settings"),
    }
}

fn parse_theme(arg: &str) -> anyhow::Result<Theme> {
    match arg.to_lowercase().as_str() {
        "" | "toggle" => Ok(Theme::Toggle),
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        other => anyhow::bail!("unknown theme {other:?}, expected light or dark"),
    }
}
