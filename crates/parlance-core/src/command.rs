//! Structured commands emitted by the router.
//!
//! The router never inspects these beyond passing them through; the JSON
//! shape (`kind` tag, snake_case) is the contract with the executor.

use serde::{Deserialize, Serialize};

/// A fully-specified application command ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredCommand {
    CreateTask { title: String },
    CompleteTask { title: String },
    ListTasks,
    SwitchNewsTab { tab: NewsTab },
    RefreshNews,
    Navigate { view: View },
    SetTheme { theme: Theme },
}

impl StructuredCommand {
    /// Short name of the command kind, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTask { .. } => "create_task",
            Self::CompleteTask { .. } => "complete_task",
            Self::ListTasks => "list_tasks",
            Self::SwitchNewsTab { .. } => "switch_news_tab",
            Self::RefreshNews => "refresh_news",
            Self::Navigate { .. } => "navigate",
            Self::SetTheme { .. } => "set_theme",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsTab {
    Ai,
    Tech,
    Science,
    Business,
    Sports,
    World,
}

impl NewsTab {
    pub const ALL: [NewsTab; 6] = [
        Self::Ai,
        Self::Tech,
        Self::Science,
        Self::Business,
        Self::Sports,
        Self::World,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Tech => "tech",
            Self::Science => "science",
            Self::Business => "business",
            Self::Sports => "sports",
            Self::World => "world",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    Tasks,
    News,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    /// Flip whatever is currently active.
    Toggle,
}
