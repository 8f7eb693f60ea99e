//! Free-text preference strings to typed [`Constraint`] records.
//!
//! Classification is keyword membership over lower-cased word tokens. The
//! polarity of a sentence (prefer / avoid / hard need) is decided once and
//! applied to every signal found in it, so "needs a lab with a projector on
//! mondays" yields three hard constraints.

use tracing::debug;
use types::{
    Constraint, ConstraintId, ConstraintKind, ConstraintPayload, ConstraintScope, DayOfWeek,
    DayPeriod, Polarity,
};

const HARD: &[&str] = &[
    "must", "need", "needs", "require", "requires", "required", "mandatory", "only", "cannot",
    "can't", "never", "mustn't",
];
const HARD_STRONG: &[&str] = &["must", "mustn't", "never", "cannot", "can't", "mandatory"];
const NEGATIVE: &[&str] = &[
    "avoid", "avoids", "not", "no", "never", "cannot", "can't", "mustn't", "dislike", "dislikes",
    "without", "unavailable", "hate", "hates",
];
const PREFER: &[&str] = &[
    "prefer", "prefers", "preferred", "preference", "like", "likes", "want", "wants", "ideally",
    "rather", "wish",
];
const INTENSIFIERS: &[&str] = &["strongly", "really", "very", "definitely", "absolutely"];

const EQUIPMENT: &[(&str, &str)] = &[
    ("projector", "projector"),
    ("projectors", "projector"),
    ("whiteboard", "whiteboard"),
    ("smartboard", "smartboard"),
    ("computer", "computers"),
    ("computers", "computers"),
    ("pcs", "computers"),
    ("microphone", "microphone"),
    ("speakers", "speakers"),
    ("camera", "camera"),
];

/// Priority table: hard 9..=10, explicit preference 6..=8, implicit 3.
fn priority(kind: ConstraintKind, polarity: Polarity, explicit: bool, strong: bool) -> u8 {
    match kind {
        ConstraintKind::Hard if strong => 10,
        ConstraintKind::Hard => 9,
        ConstraintKind::Soft if !explicit => 3,
        ConstraintKind::Soft if strong => 8,
        ConstraintKind::Soft => match polarity {
            Polarity::Avoid => 7,
            Polarity::Prefer => 6,
        },
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn day_of(token: &str) -> &'static [DayOfWeek] {
    match token {
        "monday" | "mondays" | "mon" => &[DayOfWeek::Mon],
        "tuesday" | "tuesdays" | "tue" | "tues" => &[DayOfWeek::Tue],
        "wednesday" | "wednesdays" | "wed" => &[DayOfWeek::Wed],
        "thursday" | "thursdays" | "thu" | "thurs" => &[DayOfWeek::Thu],
        "friday" | "fridays" | "fri" => &[DayOfWeek::Fri],
        "saturday" | "saturdays" | "sat" => &[DayOfWeek::Sat],
        "sunday" | "sundays" | "sun" => &[DayOfWeek::Sun],
        "weekend" | "weekends" => &[DayOfWeek::Sat, DayOfWeek::Sun],
        _ => &[],
    }
}

fn period_of(token: &str) -> Option<DayPeriod> {
    match token {
        "morning" | "mornings" | "early" => Some(DayPeriod::Morning),
        "afternoon" | "afternoons" | "midday" | "noon" | "lunch" => Some(DayPeriod::Afternoon),
        "evening" | "evenings" | "night" | "nights" | "late" => Some(DayPeriod::Evening),
        _ => None,
    }
}

/// Parses one preference string. Text without any recognised signal yields
/// no constraints.
pub fn parse_preference(text: &str, scope: &ConstraintScope) -> Vec<Constraint> {
    let tokens = tokenize(text);
    let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));

    let kind = if has(HARD) {
        ConstraintKind::Hard
    } else {
        ConstraintKind::Soft
    };
    let polarity = if has(NEGATIVE) {
        Polarity::Avoid
    } else {
        Polarity::Prefer
    };
    let explicit = has(PREFER) || has(NEGATIVE);
    let strong = match kind {
        ConstraintKind::Hard => has(HARD_STRONG),
        ConstraintKind::Soft => has(INTENSIFIERS),
    };
    let prio = priority(kind, polarity, explicit, strong);

    let mut payloads: Vec<ConstraintPayload> = Vec::new();
    let mut push = |p: ConstraintPayload| {
        if !payloads.contains(&p) {
            payloads.push(p);
        }
    };
    for t in &tokens {
        if let Some(period) = period_of(t) {
            push(ConstraintPayload::TimeOfDay { period, polarity });
        }
        for &day in day_of(t) {
            push(ConstraintPayload::Day { day, polarity });
        }
        if matches!(t.as_str(), "lab" | "labs" | "laboratory") {
            push(ConstraintPayload::Lab { polarity });
        }
        if let Some((_, item)) = EQUIPMENT.iter().find(|(k, _)| *k == t.as_str()) {
            push(ConstraintPayload::Equipment {
                item: (*item).to_string(),
                polarity,
            });
        }
    }

    let trimmed = text.trim();
    let out: Vec<Constraint> = payloads
        .into_iter()
        .enumerate()
        .map(|(n, payload)| Constraint {
            id: ConstraintId(format!("{}:{}:{}", entity_tag(scope), scope.id, n)),
            kind,
            priority: prio,
            description: format!("{} ({trimmed})", describe(&payload)),
            scope: scope.clone(),
            payload,
        })
        .collect();
    debug!(scope = %scope.id, found = out.len(), "parsed preference");
    out
}

/// Parses many `(scope, text)` pairs, keeping ids unique per scope.
pub fn parse_all<'a>(
    items: impl IntoIterator<Item = (&'a ConstraintScope, &'a str)>,
) -> Vec<Constraint> {
    let mut out: Vec<Constraint> = Vec::new();
    for (k, (scope, text)) in items.into_iter().enumerate() {
        for mut c in parse_preference(text, scope) {
            c.id = ConstraintId(format!("{}#{k}", c.id));
            out.push(c);
        }
    }
    out
}

fn entity_tag(scope: &ConstraintScope) -> &'static str {
    match scope.entity {
        types::EntityType::Instructor => "instructor",
        types::EntityType::Room => "room",
        types::EntityType::Course => "course",
    }
}

fn verb(p: Polarity) -> &'static str {
    match p {
        Polarity::Prefer => "prefers",
        Polarity::Avoid => "avoids",
    }
}

pub fn describe(payload: &ConstraintPayload) -> String {
    match payload {
        ConstraintPayload::TimeOfDay { period, polarity } => {
            format!("{} {:?}", verb(*polarity), period).to_lowercase()
        }
        ConstraintPayload::Lab { polarity } => match polarity {
            Polarity::Prefer => "requires lab".into(),
            Polarity::Avoid => "avoids lab".into(),
        },
        ConstraintPayload::Equipment { item, polarity } => format!("{} {item}", verb(*polarity)),
        ConstraintPayload::Day { day, polarity } => format!("{} {day}", verb(*polarity)),
    }
}
