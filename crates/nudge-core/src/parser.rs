//! Parser - テキストからリマインダーマーカーを抽出する
//!
//! マーカー形式: `(<tag>@YYYY-MM-DD HH:MM)`（例: `(discord@2025-01-01 09:00)`）
//!
//! # 設計原則
//! - 純粋関数（状態なし・副作用なし、ログ出力を除く）
//! - content は「直前のマーカーの終端（または文書先頭）からこのマーカーまで」
//! - 暦として不正な日時（13月、25時、DST の存在しない時刻）はタスクにしない

use chrono::{FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::domain::{NudgeError, Task};

pub const DEFAULT_MARKER_TAG: &str = "discord";

const PAYLOAD_FORMAT: &str = "%Y-%m-%d %H:%M";

static DEFAULT_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&marker_pattern(DEFAULT_MARKER_TAG)).expect("valid default marker regex")
});

/// 未チェックのリスト項目プレフィックス（`- [ ]`, `* [ ]`, `+ [ ]`）
static UNCHECKED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*+] \[ \]").expect("valid checkbox regex"));

fn marker_pattern(tag: &str) -> String {
    // (?s): content may span lines. Lazy `.*?` stops at the first marker,
    // so one marker never swallows text belonging to the next.
    format!(
        r"(?s)(?P<content>.*?)\({}@(?P<due>\d{{4}}-\d{{2}}-\d{{2}} \d{{2}}:\d{{2}})\)",
        regex::escape(tag)
    )
}

/// マーカーの時刻を解釈するタイムゾーン
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WallClock {
    #[default]
    Local,
    Fixed(FixedOffset),
}

/// タグ名を差し替え可能なマーカー文法
#[derive(Debug, Clone)]
pub struct MarkerGrammar {
    tag: String,
    re: Regex,
    zone: WallClock,
}

impl MarkerGrammar {
    pub fn new(tag: impl Into<String>) -> Result<Self, NudgeError> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(NudgeError::Config("marker tag must not be empty".into()));
        }
        let re = Regex::new(&marker_pattern(&tag))
            .map_err(|e| NudgeError::Config(format!("invalid marker tag `{tag}`: {e}")))?;
        Ok(Self {
            tag,
            re,
            zone: WallClock::Local,
        })
    }

    pub fn with_zone(mut self, zone: WallClock) -> Self {
        self.zone = zone;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn zone(&self) -> WallClock {
        self.zone
    }

    /// タスクを抽出する（時刻は文法のタイムゾーンで解釈）
    pub fn parse(&self, text: &str) -> Vec<Task> {
        match self.zone {
            WallClock::Local => self.parse_in(text, &Local),
            WallClock::Fixed(offset) => self.parse_in(text, &offset),
        }
    }

    /// ドキュメント順にタスクを抽出する（時刻は `tz` で解釈）
    pub fn parse_in<Tz: TimeZone>(&self, text: &str, tz: &Tz) -> Vec<Task> {
        let mut tasks = Vec::new();
        for caps in self.re.captures_iter(text) {
            let raw_content = caps.name("content").map_or("", |m| m.as_str());
            let payload = caps.name("due").map_or("", |m| m.as_str());

            let Some(due) = resolve_due(payload, tz) else {
                warn!(tag = %self.tag, payload, "ignoring marker with invalid date-time");
                continue;
            };
            tasks.push(Task::new(clean_content(raw_content), due));
        }
        tasks
    }
}

impl Default for MarkerGrammar {
    fn default() -> Self {
        Self {
            tag: DEFAULT_MARKER_TAG.to_string(),
            re: DEFAULT_MARKER_RE.clone(),
            zone: WallClock::Local,
        }
    }
}

/// 既定の `discord` タグとローカル時刻で抽出する
pub fn parse_tasks(text: &str) -> Vec<Task> {
    MarkerGrammar::default().parse(text)
}

fn resolve_due<Tz: TimeZone>(payload: &str, tz: &Tz) -> Option<chrono::DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(payload, PAYLOAD_FORMAT).ok()?;
    // DST overlap -> earlier instant; DST gap -> None.
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn clean_content(raw: &str) -> String {
    let trimmed = raw.trim();
    match UNCHECKED_ITEM_RE.find(trimmed) {
        Some(prefix) => trimmed[prefix.end()..].trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use rstest::rstest;

    fn parse_utc(text: &str) -> Vec<Task> {
        MarkerGrammar::default().parse_in(text, &Utc)
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(parse_utc("").is_empty());
        assert!(parse_utc("# Notes\n\nno reminders here").is_empty());
    }

    #[rstest]
    #[case::unchecked("- [ ] Buy milk (discord@2025-01-01 09:00)", "Buy milk")]
    #[case::checked("- [x] Buy milk (discord@2025-01-01 09:00)", "- [x] Buy milk")]
    #[case::plain("Buy milk (discord@2025-01-01 09:00)", "Buy milk")]
    #[case::star_item("* [ ] Buy milk (discord@2025-01-01 09:00)", "Buy milk")]
    #[case::padded("   - [ ]    Buy milk   (discord@2025-01-01 09:00)", "Buy milk")]
    fn strips_only_unchecked_prefix(#[case] text: &str, #[case] expected: &str) {
        let tasks = parse_utc(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].content(), expected);
    }

    #[test]
    fn due_is_read_from_payload() {
        let tasks = parse_utc("ship it (discord@2025-06-15 17:45)");
        assert_eq!(tasks[0].due(), Utc.with_ymd_and_hms(2025, 6, 15, 17, 45, 0).unwrap());
        assert_eq!(tasks[0].identity().as_str(), "ship it-2025-06-15T17:45:00.000Z");
    }

    #[test]
    fn wall_clock_is_interpreted_in_given_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let tasks = MarkerGrammar::default().parse_in("x (discord@2025-01-01 09:00)", &tokyo);
        assert_eq!(tasks[0].identity().as_str(), "x-2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn grammar_zone_applies_to_parse() {
        let zone = WallClock::Fixed(FixedOffset::east_opt(0).unwrap());
        let utc = MarkerGrammar::default().with_zone(zone);
        let text = "x (discord@2025-01-01 09:00)";
        assert_eq!(utc.parse(text), parse_utc(text));
    }

    #[test]
    fn consecutive_markers_do_not_leak_content() {
        let text = "- [ ] first (discord@2025-01-01 09:00)\n- [ ] second (discord@2025-01-02 10:30)\n";
        let tasks = parse_utc(text);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].content(), "first");
        assert_eq!(tasks[1].content(), "second");
    }

    #[test]
    fn content_spans_from_previous_marker() {
        let text = "intro line\nwater plants (discord@2025-01-01 09:00) then\nmore text (discord@2025-01-01 10:00)";
        let tasks = parse_utc(text);
        assert_eq!(tasks[0].content(), "intro line\nwater plants");
        assert_eq!(tasks[1].content(), "then\nmore text");
    }

    #[test]
    fn back_to_back_markers_yield_empty_content() {
        let tasks = parse_utc("a (discord@2025-01-01 09:00)(discord@2025-01-01 10:00)");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].content(), "");
    }

    #[rstest]
    #[case::seconds("x (discord@2025-01-01 09:00:00)")]
    #[case::single_digit_month("x (discord@2025-1-01 09:00)")]
    #[case::timezone("x (discord@2025-01-01 09:00Z)")]
    #[case::other_tag("x (slack@2025-01-01 09:00)")]
    #[case::no_parens("x discord@2025-01-01 09:00")]
    #[case::t_separator("x (discord@2025-01-01T09:00)")]
    fn malformed_markers_are_not_tasks(#[case] text: &str) {
        assert!(parse_utc(text).is_empty());
    }

    #[rstest]
    #[case::month_13("x (discord@2024-13-40 25:99)")]
    #[case::feb_30("x (discord@2025-02-30 09:00)")]
    #[case::hour_24("x (discord@2025-01-01 24:00)")]
    fn calendrically_invalid_markers_are_rejected(#[case] text: &str) {
        assert!(parse_utc(text).is_empty());
    }

    #[rstest]
    // 夏時間開始: 02:00-03:00 は存在しない
    #[case::dst_gap("x (discord@2025-03-09 02:30)", None)]
    // 夏時間終了: 01:30 が 2 回ある -> 早い方（EDT, UTC-4）
    #[case::dst_overlap("x (discord@2025-11-02 01:30)", Some("x-2025-11-02T05:30:00.000Z"))]
    #[case::ordinary("x (discord@2025-11-02 03:30)", Some("x-2025-11-02T08:30:00.000Z"))]
    fn dst_transitions_in_real_zone(#[case] text: &str, #[case] expected: Option<&str>) {
        let tasks = MarkerGrammar::default().parse_in(text, &New_York);
        let identity = tasks.first().map(|t| t.identity().as_str().to_string());
        assert_eq!(identity.as_deref(), expected);
    }

    #[test]
    fn invalid_marker_is_consumed_before_next_task() {
        let tasks = parse_utc("bad (discord@2025-02-30 09:00) good (discord@2025-03-01 09:00)");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].content(), "good");
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "- [ ] a (discord@2025-01-01 09:00)\nb (discord@2025-01-02 09:00)";
        let first: Vec<_> = parse_utc(text).iter().map(|t| t.identity().clone()).collect();
        let second: Vec<_> = parse_utc(text).iter().map(|t| t.identity().clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_tag_is_escaped() {
        let grammar = MarkerGrammar::new("remind.me").unwrap();
        assert_eq!(grammar.parse_in("x (remind.me@2025-01-01 09:00)", &Utc).len(), 1);
        assert!(grammar.parse_in("x (remindXme@2025-01-01 09:00)", &Utc).is_empty());
    }

    #[test]
    fn empty_tag_is_rejected() {
        assert!(matches!(MarkerGrammar::new("  "), Err(NudgeError::Config(_))));
    }
}
