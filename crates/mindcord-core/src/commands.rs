//! Prefixed chat commands and the text of their replies.

use rand::seq::SliceRandom;
use strum::{Display, IntoStaticStr};

use crate::engine::{MoodReport, StatusReport};
use crate::error::{MindcordError, MindcordResult};
use crate::types::{Reminder, UserProfile, VenueProfile};

const REMEMBER_REPLIES: &[&str] = &[
    "got it, filed away in my memory",
    "noted! i'll remember that",
    "added to my brain database about you",
    "stored in the memory banks",
];

/// Which command was invoked, without its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    Mood,
    Remember,
    Forget,
    MyData,
    ServerData,
    Status,
    Remind,
}

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mood,
    Remember { text: String },
    Forget { text: String },
    MyData,
    ServerData,
    Status,
    Remind { minutes: i64, text: String },
}

impl CommandKind {
    /// Look up a command by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mood" => Some(Self::Mood),
            "remember" => Some(Self::Remember),
            "forget" => Some(Self::Forget),
            "my_data" | "mydata" => Some(Self::MyData),
            "server_data" | "serverdata" => Some(Self::ServerData),
            "status" => Some(Self::Status),
            "remind" => Some(Self::Remind),
            _ => None,
        }
    }
}

/// A recognised command, whose arguments may still be invalid.
#[derive(Debug)]
pub struct Invocation {
    pub kind: CommandKind,
    pub command: MindcordResult<Command>,
}

impl Command {
    /// Parse `text` as a command introduced by `prefix`.
    ///
    /// Returns `None` when the text is not a command at all (no prefix, or an
    /// unknown command name), so it can flow through the normal reactive path.
    /// A known command with bad arguments carries a validation error whose
    /// suggestion is the usage line.
    pub fn parse(prefix: &str, text: &str) -> Option<Invocation> {
        if prefix.is_empty() {
            return None;
        }
        let body = text.trim_start().strip_prefix(prefix)?;
        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body.trim_end(), ""),
        };
        let kind = CommandKind::from_name(name)?;

        let command = match kind {
            CommandKind::Mood => Ok(Command::Mood),
            CommandKind::MyData => Ok(Command::MyData),
            CommandKind::ServerData => Ok(Command::ServerData),
            CommandKind::Status => Ok(Command::Status),
            CommandKind::Remember => required_text(args, prefix, "remember <something about you>")
                .map(|text| Command::Remember { text }),
            CommandKind::Forget => required_text(args, prefix, "forget <text to match>")
                .map(|text| Command::Forget { text }),
            CommandKind::Remind => parse_remind(prefix, args),
        };
        Some(Invocation { kind, command })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Mood => CommandKind::Mood,
            Command::Remember { .. } => CommandKind::Remember,
            Command::Forget { .. } => CommandKind::Forget,
            Command::MyData => CommandKind::MyData,
            Command::ServerData => CommandKind::ServerData,
            Command::Status => CommandKind::Status,
            Command::Remind { .. } => CommandKind::Remind,
        }
    }
}

fn usage(prefix: &str, form: &str) -> String {
    format!("usage: {}{}", prefix, form)
}

fn required_text(args: &str, prefix: &str, form: &str) -> MindcordResult<String> {
    if args.is_empty() {
        return Err(MindcordError::validation_with_suggestion(
            "missing text",
            usage(prefix, form),
        ));
    }
    Ok(args.to_string())
}

fn parse_remind(prefix: &str, args: &str) -> MindcordResult<Command> {
    let form = "remind <minutes> <text>";
    let (minutes, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    let minutes: i64 = minutes.parse().map_err(|_| {
        MindcordError::validation_with_suggestion(
            format!("'{}' is not a number of minutes", minutes),
            usage(prefix, form),
        )
    })?;
    let text = required_text(text.trim(), prefix, form)?;
    Ok(Command::Remind { minutes, text })
}

fn pick(options: &[String]) -> String {
    options
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default()
}

/// Reply to the mood command.
pub fn mood_reply(report: &MoodReport) -> String {
    let mood = &report.main_mood;
    let energy = report.energy_level.to_string().replace('_', " ");
    pick(&[
        format!("im feeling {} rn, energy level is {}", mood, energy),
        format!("current mood: {}, pretty {} energy", mood, energy),
        format!("honestly feeling {} today, {} energy vibes", mood, energy),
    ])
}

/// Acknowledgement for a stored memory.
pub fn remember_reply() -> &'static str {
    REMEMBER_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("noted! i'll remember that")
}

pub fn forget_reply(removed: usize) -> String {
    match removed {
        0 => "couldn't find anything like that to forget".to_string(),
        1 => "done, forgot that one".to_string(),
        n => format!("done, forgot {} things about you", n),
    }
}

/// Summary of what the agent knows about a user.
pub fn user_summary(profile: Option<&UserProfile>, reminders: &[Reminder]) -> String {
    let Some(profile) = profile else {
        return "i don't have any data about you yet".to_string();
    };

    let mut out = format!(
        "What I know about {}\nRelationship: {}\nInteractions: {}\nSince: {}",
        profile.display_name,
        profile.relationship_level,
        profile.total_interactions,
        profile.first_seen.format("%Y-%m-%d"),
    );
    let recent = profile.recent_memories(3);
    if !recent.is_empty() {
        out.push_str("\nRecent memories:");
        for memory in recent {
            out.push_str("\n• ");
            out.push_str(&memory.text);
        }
    }
    if !reminders.is_empty() {
        out.push_str("\nPending reminders:");
        for reminder in reminders {
            out.push_str(&format!(
                "\n• {} ({})",
                reminder.text,
                reminder.fire_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }
    }
    out
}

/// Summary of a venue. `None` means the command came from a private channel.
pub fn venue_summary(venue: Option<&VenueProfile>) -> String {
    match venue {
        None => "this only works in servers".to_string(),
        Some(venue) => {
            let mut out = format!(
                "Server: {}\nCulture: {}\nMy role: {}\nMembers: {}",
                venue.name, venue.culture, venue.my_role, venue.member_count
            );
            if !venue.common_topics.is_empty() {
                out.push_str(&format!("\nTopics: {}", venue.common_topics.join(", ")));
            }
            out
        }
    }
}

pub fn status_reply(status: &StatusReport) -> String {
    let loop_failures: u64 = status.loops.values().map(|l| l.failures).sum();
    let mut out = format!(
        "{} status\nMood: {} ({} energy)\nUsers known: {}\nServers known: {}\nPending reminders: {}\nLast response time: {}ms\nLoop failures: {}",
        status.agent_name,
        status.mood,
        status.energy_level,
        status.users,
        status.venues,
        status.pending_reminders,
        status.engine.last_latency_ms,
        loop_failures,
    );
    if let Some(thought) = &status.current_thought {
        out.push_str("\nThinking about: ");
        out.push_str(thought);
    }
    out
}

pub fn reminder_reply(reminder: &Reminder, minutes: i64) -> String {
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("ok, i'll remind you in {} {}: {}", minutes, unit, reminder.text)
}

/// Reply for a command that could not be carried out.
pub fn error_reply(error: &MindcordError) -> String {
    match error {
        MindcordError::Validation { message, .. } => match error.suggestion() {
            Some(suggestion) => format!("{} ({})", message, suggestion),
            None => message.clone(),
        },
        e if e.is_storage() => "my memory is acting up right now, try again in a bit".to_string(),
        _ => "something went wrong with that command".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn parse_ok(text: &str) -> Command {
        let invocation = Command::parse("!", text).unwrap();
        let command = invocation.command.unwrap();
        assert_eq!(command.kind(), invocation.kind);
        command
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_ok("!mood"), Command::Mood);
        assert_eq!(parse_ok("  !MOOD  "), Command::Mood);
        assert_eq!(parse_ok("!my_data"), Command::MyData);
        assert_eq!(parse_ok("!server_data"), Command::ServerData);
        assert_eq!(parse_ok("!status"), Command::Status);
    }

    #[test]
    fn test_parse_text_arguments() {
        assert_eq!(
            parse_ok("!remember i like   pizza"),
            Command::Remember {
                text: "i like   pizza".into()
            }
        );
        assert_eq!(parse_ok("!forget pizza"), Command::Forget { text: "pizza".into() });
        assert_eq!(
            parse_ok("!remind 15 take out the trash"),
            Command::Remind {
                minutes: 15,
                text: "take out the trash".into()
            }
        );
    }

    #[test]
    fn test_non_commands_pass_through() {
        assert!(Command::parse("!", "hello there").is_none());
        assert!(Command::parse("!", "!dance").is_none());
        assert!(Command::parse("!", "").is_none());
        assert!(Command::parse("", "!mood").is_none());
    }

    #[test]
    fn test_bad_arguments_carry_usage() {
        let invocation = Command::parse("!", "!remember").unwrap();
        assert_eq!(invocation.kind, CommandKind::Remember);
        let err = invocation.command.unwrap_err();
        assert_eq!(err.suggestion(), Some("usage: !remember <something about you>"));

        let err = Command::parse("!", "!remind soon stretch").unwrap().command.unwrap_err();
        assert!(error_reply(&err).contains("usage: !remind <minutes> <text>"));

        assert!(Command::parse("!", "!remind 10").unwrap().command.is_err());
    }

    #[test]
    fn test_user_summary_shows_last_three_memories() {
        let now = Utc::now();
        let mut profile = UserProfile::new("Sam", now);
        profile.total_interactions = 12;
        profile.recompute_relationship();
        for text in ["one", "two", "three", "four"] {
            profile.remember(text, now);
        }

        let summary = user_summary(Some(&profile), &[]);
        assert!(summary.contains("Relationship: acquaintance"));
        assert!(summary.contains("Interactions: 12"));
        assert!(!summary.contains("• one"));
        assert!(summary.contains("• four"));
        assert!(!summary.contains("Pending reminders"));
        assert_eq!(user_summary(None, &[]), "i don't have any data about you yet");
    }

    #[test]
    fn test_user_summary_lists_pending_reminders() {
        let now = Utc::now();
        let profile = UserProfile::new("Sam", now);
        let reminder = Reminder::new("u1", "c1", "stretch", now);

        let summary = user_summary(Some(&profile), &[reminder]);
        assert!(summary.contains("Pending reminders:\n• stretch ("));
    }

    #[test]
    fn test_venue_summary() {
        let mut venue = VenueProfile::new("Rustaceans", Utc::now());
        venue.member_count = 42;
        let summary = venue_summary(Some(&venue));
        assert!(summary.contains("Culture: learning"));
        assert!(summary.contains("My role: observer"));
        assert!(summary.contains("Members: 42"));
        assert!(!summary.contains("Topics"));
        assert_eq!(venue_summary(None), "this only works in servers");

        venue.add_topic("rust");
        venue.add_topic("music");
        assert!(venue_summary(Some(&venue)).contains("Topics: rust, music"));
    }

    #[test]
    fn test_phrase_sets() {
        assert!(REMEMBER_REPLIES.contains(&remember_reply()));
        assert_eq!(forget_reply(0), "couldn't find anything like that to forget");
        assert_eq!(forget_reply(3), "done, forgot 3 things about you");
    }
}
