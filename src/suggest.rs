use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::{Emote, GLOBAL_EMOTE_SCOPE, NormalizedCommand};
use crate::state::TerminalState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub token: String,
    pub properties: SuggestionProps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionProps {
    None,
    Emote(Emote),
    ChannelCommand(NormalizedCommand),
}

impl Suggestion {
    fn plain(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            properties: SuggestionProps::None,
        }
    }
}

/// Suggestions for the current draft. Returns `None` for a blank draft, in
/// which case the panel is hidden and the previous list is left untouched.
pub fn compute_suggestions(input: &str, state: &TerminalState) -> Option<Vec<Suggestion>> {
    if input.trim().is_empty() {
        return None;
    }
    let tokens = input.split(' ').collect::<Vec<_>>();
    let current = tokens.last().copied().unwrap_or_default();
    let first = tokens[0];
    let named_channel = tokens.get(1).and_then(|token| token.strip_prefix('#'));

    let matches = if current.starts_with('#') && (first == "/say" || first == "/exit") {
        channel_names(&current[1..], state)
    } else if let Some(query) = current.strip_prefix(':') {
        let channel = named_channel.or(state.active_channel.as_deref());
        emotes(query, channel, state)
    } else if current.starts_with('!') && (named_channel.is_some() || state.active_channel.is_some())
    {
        let channel = named_channel.or(state.active_channel.as_deref());
        channel_commands(current, channel, state)
    } else if tokens.len() == 1 {
        state
            .available_commands
            .keys()
            .filter(|name| name.starts_with(current))
            .map(Suggestion::plain)
            .collect()
    } else {
        parameters(&tokens, state)
    };
    Some(dedup(matches))
}

fn channel_names(prefix: &str, state: &TerminalState) -> Vec<Suggestion> {
    state
        .available_commands_channel
        .keys()
        .filter(|channel| channel.starts_with(prefix))
        .map(|channel| Suggestion::plain(format!("#{channel}")))
        .collect()
}

fn emotes(query: &str, channel: Option<&str>, state: &TerminalState) -> Vec<Suggestion> {
    let query = query.to_lowercase();
    let scoped = channel
        .and_then(|channel| state.available_emotes.get(channel))
        .into_iter()
        .flatten();
    let global = state
        .available_emotes
        .get(GLOBAL_EMOTE_SCOPE)
        .into_iter()
        .flatten();
    scoped
        .chain(global)
        .filter(|emote| emote.code.to_lowercase().contains(&query))
        .map(|emote| Suggestion {
            token: emote.code.clone(),
            properties: SuggestionProps::Emote(emote.clone()),
        })
        .collect()
}

fn channel_commands(current: &str, channel: Option<&str>, state: &TerminalState) -> Vec<Suggestion> {
    let Some(catalog) = channel.and_then(|channel| state.available_commands_channel.get(channel))
    else {
        return Vec::new();
    };
    let query = current[1..].to_lowercase();
    let mut commands = catalog
        .normalized()
        .into_iter()
        .filter(|command| {
            query.is_empty()
                || command.command_id.to_lowercase().contains(&query)
                || command
                    .aliases
                    .iter()
                    .any(|alias| alias.to_lowercase().contains(&query))
        })
        .collect::<Vec<_>>();
    commands.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| {
                a.command_id
                    .to_lowercase()
                    .cmp(&b.command_id.to_lowercase())
            })
            .then_with(|| a.command_id.cmp(&b.command_id))
    });
    commands
        .into_iter()
        .map(|command| Suggestion {
            token: command.command_id.clone(),
            properties: SuggestionProps::ChannelCommand(command),
        })
        .collect()
}

fn parameters(tokens: &[&str], state: &TerminalState) -> Vec<Suggestion> {
    let Some(spec) = state.available_commands.get(tokens[0]) else {
        return Vec::new();
    };
    let last = tokens.len() - 1;
    let current = tokens[last].strip_prefix('!').unwrap_or(tokens[last]);
    let used = |param: &str| {
        tokens[..last]
            .iter()
            .any(|token| *token == param || token.strip_prefix('!') == Some(param))
    };
    spec.params
        .iter()
        .filter(|param| param.starts_with(current) && !used(param.as_str()))
        .map(|param| Suggestion::plain(format!("!{param}")))
        .collect()
}

fn dedup(matches: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|suggestion| seen.insert(suggestion.token.clone()))
        .collect()
}

/// Replaces the last space-separated token of `input` with `token` and
/// leaves a trailing space for the next argument.
pub fn apply_suggestion(input: &str, token: &str) -> String {
    let head = match input.rfind(' ') {
        Some(index) => &input[..=index],
        None => "",
    };
    format!("{head}{token} ")
}

#[cfg(test)]
#[path = "../tests/unit/suggest_tests.rs"]
mod tests;
