//! Prompt templates for the generation service, and parsers for the answers
//! that carry structure.

use chrono::{DateTime, Local};

use crate::types::{InboundEvent, PersonalityState, UserProfile, MOOD_VOCABULARY};

/// Describe what a channel is usually for, from its name.
pub fn channel_context(channel_name: &str) -> Option<&'static str> {
    let name = channel_name.trim_start_matches('#').to_lowercase();
    let context = match name.as_str() {
        "general" => "casual conversation",
        "gaming" => "gaming discussion",
        "memes" => "meme sharing and jokes",
        "serious" => "serious discussion",
        "tech" => "technology discussion",
        "music" => "music sharing",
        "art" => "art and creative content",
        _ => return None,
    };
    Some(context)
}

fn channel_line(event: &InboundEvent) -> String {
    if event.is_private {
        return "- Channel: private message".to_string();
    }
    match event.channel_name.as_deref() {
        Some(name) => match channel_context(name) {
            Some(context) => format!("- Channel: #{} ({})", name, context),
            None => format!("- Channel: #{}", name),
        },
        None => "- Channel: a group channel".to_string(),
    }
}

// ============================================================================
// Reactive path
// ============================================================================

/// Prompt for a conversational reply.
pub fn response_prompt(
    agent_name: &str,
    creator_name: Option<&str>,
    personality: &PersonalityState,
    user: &UserProfile,
    event: &InboundEvent,
) -> String {
    let origin = match creator_name {
        Some(creator) => format!("You live in a chat server and were created by {}.", creator),
        None => "You live in a chat server.".to_string(),
    };
    let states = if personality.custom_states.is_empty() {
        "none".to_string()
    } else {
        personality.custom_states.join(", ")
    };
    let memories = user
        .recent_memories(3)
        .iter()
        .map(|m| format!("  - {}", m.text))
        .collect::<Vec<_>>();
    let memories = if memories.is_empty() {
        "  - nothing yet".to_string()
    } else {
        memories.join("\n")
    };
    let thought = personality
        .current_thought()
        .map(|t| format!("\n- On your mind: {}", t))
        .unwrap_or_default();

    format!(
        r#"You are {agent}, an AI who tries to act human but is still somewhat AI-like.
{origin}

Current personality state:
- Main mood: {mood}
- Energy: {energy}
- Custom states: {states}{thought}

Person you're talking to:
- Name: {name}
- Relationship: {relationship}
- Total interactions: {interactions}
- Things they asked you to remember:
{memories}
{channel}

Their message: "{text}"

Instructions:
- Act human-like but don't completely hide that you're an AI
- Keep responses 1-2 sentences for casual chat
- Match your current mood naturally
- Remember your relationship with this person
- Don't be overly helpful or assistant-like

Respond as {agent}:"#,
        agent = agent_name,
        origin = origin,
        mood = personality.main_mood,
        energy = personality.energy_level,
        states = states,
        thought = thought,
        name = user.display_name,
        relationship = user.relationship_level,
        interactions = user.total_interactions,
        memories = memories,
        channel = channel_line(event),
        text = event.text,
    )
}

/// Yes/no question used by the delegated engagement decision.
pub fn decision_prompt(
    agent_name: &str,
    personality: &PersonalityState,
    user: &UserProfile,
    event: &InboundEvent,
) -> String {
    format!(
        r#"You are {agent}, an AI who tries to act human but is still somewhat AI-like.

Current situation:
- User: {name} (relationship: {relationship})
- Your mood: {mood}, energy {energy}
- Message: "{text}"
{channel}

Should you respond to this message? Consider your mood and energy, your
relationship with this person, and whether the conversation needs your input.

Respond with just "yes" or "no" and a brief reason."#,
        agent = agent_name,
        name = user.display_name,
        relationship = user.relationship_level,
        mood = personality.main_mood,
        energy = personality.energy_level,
        text = event.text,
        channel = channel_line(event),
    )
}

/// Interpret a yes/no answer. Only the first word counts, so "no, yes
/// maybe later" is a no.
pub fn parse_yes_no(answer: &str) -> bool {
    answer
        .trim()
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .map(|w| w.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

// ============================================================================
// Mood evolution
// ============================================================================

/// What the generation service decided about the mood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoodDecision {
    /// Switch to `mood`; `note` is the optional explanation.
    Change { mood: String, note: Option<String> },
    Stay,
}

/// Prompt asking whether the mood should change.
pub fn mood_prompt(agent_name: &str, personality: &PersonalityState, now: DateTime<Local>) -> String {
    let recent = personality.recent_moods(5);
    let recent = if recent.is_empty() {
        "none".to_string()
    } else {
        recent.join(", ")
    };

    format!(
        r#"You are {agent}. Your current personality:
- Main mood: {mood}
- Energy: {energy}
- Recent moods: {recent}

Current time: {time}

Available moods: {vocabulary}

Should you change your mood? Consider the time of day, how long you've been
in the current mood, and natural mood progression.

If changing mood, pick from the list or create a custom one.
Respond with: "CHANGE: [new_mood]" or "STAY: [current_mood]"
If custom mood, explain it briefly on the next line."#,
        agent = agent_name,
        mood = personality.main_mood,
        energy = personality.energy_level,
        recent = recent,
        time = now.format("%H:%M"),
        vocabulary = MOOD_VOCABULARY.join(", "),
    )
}

/// Parse a `CHANGE:` / `STAY:` answer.
///
/// Returns `None` when the answer follows neither form.
pub fn parse_mood_decision(answer: &str) -> Option<MoodDecision> {
    let mut lines = answer.trim().lines();
    let first = lines.next()?.trim().trim_matches(|c| c == '"' || c == '*');

    if let Some(rest) = strip_prefix_ignore_case(first, "CHANGE:") {
        let mood = rest
            .trim()
            .trim_matches(|c: char| c == '[' || c == ']' || c == '"' || c == '.')
            .trim()
            .to_lowercase();
        if mood.is_empty() {
            return None;
        }
        let note = lines
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string);
        return Some(MoodDecision::Change { mood, note });
    }
    if strip_prefix_ignore_case(first, "STAY:").is_some() || first.eq_ignore_ascii_case("STAY") {
        return Some(MoodDecision::Stay);
    }
    None
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s.is_char_boundary(prefix.len()) && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

// ============================================================================
// Outreach
// ============================================================================

/// Prompt for an unprompted conversation starter.
pub fn outreach_prompt(agent_name: &str, personality: &PersonalityState, user: &UserProfile) -> String {
    format!(
        r#"You are {agent}, feeling {mood} right now.

You want to start a conversation with {name} ({relationship}).

Create a natural conversation starter. Be casual, match your mood.
Don't be overly energetic or try too hard.

Just send a message like you're reaching out to a friend:"#,
        agent = agent_name,
        mood = personality.main_mood,
        name = user.display_name,
        relationship = user.relationship_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_change_with_note() {
        let decision = parse_mood_decision("CHANGE: [Sleepy]\nit's late and I've been coding all day").unwrap();
        assert_eq!(
            decision,
            MoodDecision::Change {
                mood: "sleepy".into(),
                note: Some("it's late and I've been coding all day".into()),
            }
        );
    }

    #[test]
    fn test_parse_stay_and_garbage() {
        assert_eq!(parse_mood_decision("STAY: chill"), Some(MoodDecision::Stay));
        assert_eq!(parse_mood_decision("stay"), Some(MoodDecision::Stay));
        assert_eq!(parse_mood_decision("I think I'll be happy"), None);
        assert_eq!(parse_mood_decision("CHANGE:   "), None);
        assert_eq!(parse_mood_decision(""), None);
    }

    #[test]
    fn test_parse_yes_no() {
        assert!(parse_yes_no("Yes, they asked a question"));
        assert!(parse_yes_no("  yes"));
        assert!(!parse_yes_no("no, yes maybe later"));
        assert!(!parse_yes_no(""));
    }

    #[test]
    fn test_channel_context() {
        assert_eq!(channel_context("#Memes"), Some("meme sharing and jokes"));
        assert_eq!(channel_context("random"), None);
    }

    #[test]
    fn test_response_prompt_includes_state() {
        let now = Utc::now();
        let mut personality = PersonalityState::new(now);
        personality.main_mood = "hyped".into();
        let mut user = UserProfile::new("Sam", now);
        user.remember("likes pizza", now);
        let event = InboundEvent::in_venue("u", "Sam", "v", "c", "what's up").with_channel_name("gaming");

        let prompt = response_prompt("Mindcord", Some("Maker"), &personality, &user, &event);
        assert!(prompt.contains("created by Maker"));
        assert!(prompt.contains("Main mood: hyped"));
        assert!(prompt.contains("likes pizza"));
        assert!(prompt.contains("#gaming (gaming discussion)"));
        assert!(prompt.contains("\"what's up\""));
    }
}
