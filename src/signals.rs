use std::sync::LazyLock;

use regex::Regex;

/// Placeholder note stored until a calendar integration confirms the slot.
pub const MEETING_TIME_PENDING: &str = "discussed on call, to be confirmed";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Permissive on purpose: transcripts are speech-to-text output.
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

static DAY_OF_WEEK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
        .expect("valid day-of-week pattern")
});

static RELATIVE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(today|tonight|tomorrow|next week|this week|next month)\b")
        .expect("valid relative-date pattern")
});

static CLOCK_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}\b|\b\d{1,2}\s?(am|pm)\b").expect("valid clock-time pattern")
});

static TIME_OF_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(morning|afternoon|evening|noon|midday)\b")
        .expect("valid time-of-day pattern")
});

static MEETING_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(meet|meeting|schedule|calendar|appointment|demo|book|invite)\b")
        .expect("valid meeting-keyword pattern")
});

/// Signals scraped from a call transcript by the webhook ingestor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptSignals {
    /// First email address mentioned, if any.
    pub email: Option<String>,
    /// Number of distinct meeting-cue categories that matched.
    pub meeting_cues: usize,
    /// Heuristic: an email plus at least two cue categories counts as an
    /// agreed meeting.
    pub conversion: bool,
}

pub fn extract_signals(transcript: &str) -> TranscriptSignals {
    let email = EMAIL_RE
        .find(transcript)
        .map(|m| m.as_str().to_string());

    let cue_patterns: [&Regex; 5] = [
        &DAY_OF_WEEK_RE,
        &RELATIVE_DATE_RE,
        &CLOCK_TIME_RE,
        &TIME_OF_DAY_RE,
        &MEETING_KEYWORD_RE,
    ];
    let meeting_cues = cue_patterns
        .iter()
        .filter(|pattern| pattern.is_match(transcript))
        .count();

    let conversion = email.is_some() && meeting_cues >= 2;

    TranscriptSignals {
        email,
        meeting_cues,
        conversion,
    }
}
