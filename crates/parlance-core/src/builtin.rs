//! Built-in intent table loaded at process start.
//!
//! Example phrases are data: they shape the centroids, so each card mixes
//! English and Russian phrasings of the same request. Resolvers only pull
//! referents (task titles, tab names) out of the raw text; deciding *which*
//! intent applies is the semantic layer's job.

use crate::CatalogError;
use crate::catalog::{IntentCard, IntentCatalog, Resolver};
use crate::command::{NewsTab, StructuredCommand, Theme, View};

/// `(id, examples, resolver)` rows, in registration order.
const TABLE: &[(&str, &[&str], Resolver)] = &[
    (
        "task.create",
        &[
            "create a task to buy milk",
            "add a new task",
            "remind me to call the dentist",
            "put pay the rent on my todo list",
            "создай задачу купить молоко",
            "добавь новую задачу",
            "напомни мне позвонить маме",
        ],
        resolve_create_task,
    ),
    (
        "task.list",
        &[
            "show my tasks",
            "what is on my todo list",
            "list everything I have to do",
            "покажи мои задачи",
            "какие у меня дела",
        ],
        resolve_list_tasks,
    ),
    (
        "task.complete",
        &[
            "mark the task as done",
            "I finished that task",
            "complete the task",
            "отметь задачу выполненной",
            "я сделал эту задачу",
        ],
        resolve_complete_task,
    ),
    (
        "news.tab.switch",
        &[
            "покажи новости про AI",
            "show me tech news",
            "switch to the sports tab",
            "open business news",
            "переключись на новости науки",
            "what is happening in the world",
        ],
        resolve_news_tab,
    ),
    (
        "news.refresh",
        &[
            "refresh the news",
            "any fresh headlines",
            "reload the news feed",
            "обнови новости",
            "есть свежие новости",
        ],
        resolve_refresh_news,
    ),
    (
        "nav.home",
        &[
            "go back home",
            "take me to the main screen",
            "open the start page",
            "вернись на главную",
            "открой главный экран",
        ],
        resolve_home,
    ),
    (
        "nav.settings",
        &[
            "open settings",
            "go to preferences",
            "I want to change my settings",
            "открой настройки",
            "перейди в настройки",
        ],
        resolve_settings,
    ),
    (
        "ui.theme",
        &[
            "switch to dark mode",
            "turn on the light theme",
            "change the color theme",
            "включи тёмную тему",
            "сделай светлую тему",
        ],
        resolve_theme,
    ),
];

/// Build the built-in catalog.
///
/// A duplicate id or an empty row in the table is an error, the same as for
/// any other registration.
pub fn catalog() -> Result<IntentCatalog, CatalogError> {
    from_table(TABLE)
}

fn from_table(table: &[(&str, &[&str], Resolver)]) -> Result<IntentCatalog, CatalogError> {
    let mut catalog = IntentCatalog::new();
    for &(id, examples, resolve) in table {
        catalog.register(IntentCard::new(id, examples, resolve))?;
    }
    Ok(catalog)
}

// ── Resolvers ──

fn resolve_list_tasks(_: &str) -> Option<StructuredCommand> {
    Some(StructuredCommand::ListTasks)
}

fn resolve_refresh_news(_: &str) -> Option<StructuredCommand> {
    Some(StructuredCommand::RefreshNews)
}

fn resolve_home(_: &str) -> Option<StructuredCommand> {
    Some(StructuredCommand::Navigate { view: View::Home })
}

fn resolve_settings(_: &str) -> Option<StructuredCommand> {
    Some(StructuredCommand::Navigate {
        view: View::Settings,
    })
}

// Request phrase grammar:
//   [please] [verb] ([article] [new] task-noun [connector] | remind-object [to])
const POLITE: &[&str] = &["please", "пожалуйста"];
const CREATE_VERBS: &[&str] = &[
    "create", "add", "make", "put", "создай", "создать", "добавь", "добавить",
];
const REMIND_VERBS: &[&str] = &["remind", "напомни"];
const REMIND_OBJECTS: &[&str] = &["me", "мне"];
const ARTICLES: &[&str] = &["a", "an", "the"];
const NEW: &[&str] = &["new", "новую", "новая"];
const TASK_NOUNS: &[&str] = &["task", "todo", "to-do", "reminder", "задачу", "задача"];
const CONNECTORS: &[&str] = &["to", "called", "named", "titled"];

/// Consume the next word if it is one of `words` (case-insensitive).
fn take<'a>(text: &'a str, words: &[&str]) -> Option<&'a str> {
    let (word, tail) = match text.split_once(char::is_whitespace) {
        Some((w, t)) => (w, t.trim_start()),
        None => (text, ""),
    };
    let bare = word
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
        .to_lowercase();
    (!bare.is_empty() && words.contains(&bare.as_str())).then_some(tail)
}

fn skip<'a>(text: &'a str, words: &[&str]) -> &'a str {
    take(text, words).unwrap_or(text)
}

/// Remove one leading request phrase, keeping everything after it.
fn strip_request(input: &str) -> &str {
    let rest = skip(input.trim(), POLITE);
    if let Some(after) = take(rest, REMIND_VERBS) {
        return skip(skip(after, REMIND_OBJECTS), &["to"]);
    }
    let after_verb = skip(rest, CREATE_VERBS);
    match take(skip(skip(after_verb, ARTICLES), NEW), TASK_NOUNS) {
        Some(after_noun) => skip(after_noun, CONNECTORS),
        None => after_verb,
    }
}

/// Trailing phrases that locate the task, not name it.
const CREATE_TRAILERS: &[&str] = &[
    "on my todo list",
    "to my todo list",
    "on my list",
    "to my list",
    "в список дел",
];

fn resolve_create_task(input: &str) -> Option<StructuredCommand> {
    let rest = strip_request(input);
    let mut title = rest.trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    for trailer in CREATE_TRAILERS {
        if title.to_lowercase().ends_with(trailer) {
            // Trailers are matched case-insensitively; their byte length is stable
            // under lowercasing for the ASCII and Cyrillic text they contain.
            let cut = title.len().saturating_sub(trailer.len());
            if title.is_char_boundary(cut) {
                title = title[..cut].trim_end();
            }
        }
    }

    if title.is_empty() {
        return None;
    }
    Some(StructuredCommand::CreateTask {
        title: title.to_string(),
    })
}

/// Quote pairs accepted around a task title.
const QUOTES: &[(char, char)] = &[('"', '"'), ('«', '»'), ('“', '”')];

fn resolve_complete_task(input: &str) -> Option<StructuredCommand> {
    QUOTES.iter().find_map(|&(open, close)| {
        let start = input.find(open)? + open.len_utf8();
        let len = input[start..].find(close)?;
        let title = input[start..start + len].trim();
        (!title.is_empty()).then(|| StructuredCommand::CompleteTask {
            title: title.to_string(),
        })
    })
}

/// Exact tokens and token prefixes that name each tab.
fn tab_keywords(tab: NewsTab) -> (&'static [&'static str], &'static [&'static str]) {
    match tab {
        NewsTab::Ai => (&["ai", "ии", "ml"], &["artificial", "искусствен", "нейросет"]),
        NewsTab::Tech => (&[], &["tech", "техн", "гаджет", "gadget"]),
        NewsTab::Science => (&[], &["scien", "наук", "научн"]),
        NewsTab::Business => (&[], &["business", "бизнес", "эконом", "financ", "финанс", "market"]),
        NewsTab::Sports => (&[], &["sport", "спорт", "football", "футбол"]),
        NewsTab::World => (&[], &["world", "international", "мир", "международ"]),
    }
}

fn resolve_news_tab(input: &str) -> Option<StructuredCommand> {
    let lower = input.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .find_map(|token| {
            NewsTab::ALL.into_iter().find(|&tab| {
                let (words, stems) = tab_keywords(tab);
                words.contains(&token) || stems.iter().any(|s| token.starts_with(s))
            })
        })
        .map(|tab| StructuredCommand::SwitchNewsTab { tab })
}

fn resolve_theme(input: &str) -> Option<StructuredCommand> {
    const DARK: &[&str] = &["dark", "night", "тёмн", "темн", "ночн"];
    const LIGHT: &[&str] = &["light", "bright", "day", "светл", "дневн"];

    let lower = input.to_lowercase();
    let mut theme = Theme::Toggle;
    for token in lower.split(|c: char| !c.is_alphanumeric()) {
        if DARK.iter().any(|s| token.starts_with(s)) {
            theme = Theme::Dark;
            break;
        }
        if LIGHT.iter().any(|s| token.starts_with(s)) {
            theme = Theme::Light;
            break;
        }
    }
    Some(StructuredCommand::SetTheme { theme })
}
