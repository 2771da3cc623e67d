//! Turn a free-text play description into a structured `PlaySpec`.
//! An LLM completion is tried first; any failure drops to a keyword heuristic.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::types::{NewsItem, PlaySpec, Side};

const DEFAULT_TIMEFRAME: &str = "1-5 days";
const DEFAULT_PRIORITY: u8 = 5;
const TAG_KEYWORDS: &[&str] = &["momentum", "breakout", "earnings", "technical", "fundamental"];
const SELL_KEYWORDS: &[&str] = &["sell", "short", "bearish", "down", "decline"];
const LONG_HORIZON_KEYWORDS: &[&str] = &["long", "position"];
/// Ten years. Keeps absurd model output inside the representable date range.
const MAX_TIMEFRAME_HOURS: f64 = 87_600.0;

/// Raw completion capability. Implementations may return anything, including non-JSON.
pub trait LlmParse: Send + Sync {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

impl<T: LlmParse + ?Sized> LlmParse for Box<T> {
    fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        (**self).complete(prompt)
    }
}

/// Used when no model is configured; always forces the heuristic path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLlm;

impl LlmParse for NoLlm {
    fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("no LLM configured")
    }
}

pub struct NaturalLanguagePlayParser<L: LlmParse> {
    llm: L,
}

impl<L: LlmParse> NaturalLanguagePlayParser<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    pub fn parse(&self, description: &str, symbol: &str) -> PlaySpec {
        self.parse_with_context(description, symbol, &[], None)
    }

    /// `news` feeds the prompt (and catalysts on fallback); `confidence` sets fallback priority.
    pub fn parse_with_context(
        &self,
        description: &str,
        symbol: &str,
        news: &[NewsItem],
        confidence: Option<f64>,
    ) -> PlaySpec {
        let prompt = build_prompt(description, symbol, news);
        match self.llm.complete(&prompt) {
            Ok(raw) => match spec_from_llm(&raw, description, symbol) {
                Some(spec) => return spec,
                None => warn!("LLM returned unusable play JSON for {}; using heuristic", symbol),
            },
            Err(e) => debug!("LLM parse unavailable for {}: {:#}", symbol, e),
        }
        heuristic_parse(description, symbol, news, confidence)
    }
}

fn build_prompt(description: &str, symbol: &str, news: &[NewsItem]) -> String {
    let mut p = format!(
        "Extract a trading play for {symbol} from the description below. Respond with a \
         single JSON object with keys: title, side (\"buy\" or \"sell\"), entry_strategy, \
         exit_strategy, catalysts (array), risks (array), success_criteria (array), timeframe \
         (e.g. \"1-5 days\"), priority (1-10), tags (array).\n\nDescription: {description}\n"
    );
    if !news.is_empty() {
        p.push_str("\nRecent news:\n");
        for n in news {
            p.push_str("- ");
            p.push_str(&n.headline);
            p.push('\n');
        }
    }
    p
}

/// Pull the outermost `{...}` out of a completion (models like to wrap JSON in prose/fences).
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Any JSON object is accepted. Fields with the wrong shape are treated as missing.
fn spec_from_llm(raw: &str, description: &str, symbol: &str) -> Option<PlaySpec> {
    let body = extract_json_object(raw)?;
    let v: Value = serde_json::from_str(body).ok()?;
    let f = v.as_object()?;
    let text = |key: &str| {
        f.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    let list = |key: &str| text_list(f.get(key));
    Some(PlaySpec {
        title: text("title").unwrap_or_else(|| format!("{} play", symbol)),
        side: text("side").as_deref().map(Side::from_loose).unwrap_or(Side::Buy),
        entry_strategy: text("entry_strategy").unwrap_or_default(),
        exit_strategy: text("exit_strategy").unwrap_or_default(),
        catalysts: list("catalysts"),
        risks: list("risks"),
        success_criteria: list("success_criteria"),
        timeframe: text("timeframe").unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string()),
        priority: priority_of(f.get("priority")).unwrap_or(DEFAULT_PRIORITY),
        tags: list("tags"),
        description: description.to_string(),
    })
}

/// An array keeps its string items; a lone string becomes a one-item list.
fn text_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Number or numeric string, rounded and clamped to 1..=10.
fn priority_of(v: Option<&Value>) -> Option<u8> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.round().clamp(1.0, 10.0) as u8)
}

/// Deterministic keyword scan. Total over any input.
pub fn heuristic_parse(
    description: &str,
    symbol: &str,
    news: &[NewsItem],
    confidence: Option<f64>,
) -> PlaySpec {
    let text = description.to_lowercase();

    let side = if SELL_KEYWORDS.iter().any(|k| text.contains(k)) {
        Side::Sell
    } else {
        Side::Buy
    };

    let timeframe = if text.contains("swing") {
        "1-2 weeks"
    } else if LONG_HORIZON_KEYWORDS.iter().any(|k| text.contains(k)) {
        "1-3 months"
    } else {
        DEFAULT_TIMEFRAME
    };

    let tags = TAG_KEYWORDS
        .iter()
        .filter(|k| text.contains(*k))
        .map(|k| k.to_string())
        .collect();

    let priority = confidence
        .map(|c| (c * 10.0).round().clamp(1.0, 10.0) as u8)
        .unwrap_or(DEFAULT_PRIORITY);

    PlaySpec {
        title: format!("{} {} play", symbol, side),
        side,
        entry_strategy: description.trim().to_string(),
        exit_strategy: "Exit on stop-loss, take-profit or timeframe expiry".to_string(),
        catalysts: news.iter().take(3).map(|n| n.headline.clone()).collect(),
        risks: Vec::new(),
        success_criteria: Vec::new(),
        timeframe: timeframe.to_string(),
        priority,
        tags,
        description: description.to_string(),
    }
}

fn timeframe_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b([0-9]+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)",
            r"(?:\s*(?:-|to)\s*(?:[0-9]+|[a-z]+))?[\s-]*(day|week|month)s?\b",
        ))
        .unwrap()
    })
}

fn count_word(s: &str) -> Option<u32> {
    let n = match s.to_ascii_lowercase().as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        // Digits only; counts too large for u32 saturate.
        other => return Some(other.parse().unwrap_or(u32::MAX)),
    };
    Some(n)
}

fn unit_hours(unit: &str) -> f64 {
    match unit.to_ascii_lowercase().as_str() {
        "week" => 168.0,
        "month" => 720.0,
        _ => 24.0,
    }
}

/// Hours implied by a free-text timeframe. The count must sit directly before the unit;
/// a range ("1-2 weeks") takes its lower bound. A bare unit word counts as one. Default 24.
/// Capped at ten years.
pub fn parse_timeframe_to_hours(timeframe: &str) -> f64 {
    if let Some(c) = timeframe_re().captures(timeframe) {
        let count = count_word(&c[1]).filter(|n| *n > 0).unwrap_or(1);
        return (count as f64 * unit_hours(&c[2])).min(MAX_TIMEFRAME_HOURS);
    }
    let t = timeframe.to_ascii_lowercase();
    if t.contains("month") {
        720.0
    } else if t.contains("week") {
        168.0
    } else {
        24.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedLlm(&'static str);

    impl LlmParse for CannedLlm {
        fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    // ---------- Heuristic ----------

    #[test]
    fn short_breakdown_is_sell_without_tags() {
        let p = NaturalLanguagePlayParser::new(NoLlm);
        let s = p.parse("Short TSLA on breakdown", "TSLA");
        assert_eq!(s.side, Side::Sell);
        assert!(s.tags.is_empty());
        assert_eq!(s.timeframe, "1-5 days");
    }

    #[test]
    fn momentum_breakout_is_buy_with_tags() {
        let p = NaturalLanguagePlayParser::new(NoLlm);
        let s = p.parse("Buy momentum breakout in NVDA", "NVDA");
        assert_eq!(s.side, Side::Buy);
        assert!(s.tags.contains(&"momentum".to_string()));
        assert!(s.tags.contains(&"breakout".to_string()));
        assert_eq!(s.priority, 5);
    }

    #[test]
    fn heuristic_timeframes() {
        let tf = |d: &str| heuristic_parse(d, "X", &[], None).timeframe;
        assert_eq!(tf("swing trade AAPL"), "1-2 weeks");
        assert_eq!(tf("long term position in MSFT"), "1-3 months");
        assert_eq!(tf("quick scalp"), "1-5 days");
    }

    #[test]
    fn side_keywords_match_inside_words() {
        let side = |d: &str| heuristic_parse(d, "NVDA", &[], None).side;
        assert_eq!(side("Buy NVDA after the slowdown"), Side::Sell);
        assert_eq!(side("buy the breakdown retest"), Side::Sell);
        assert_eq!(side("Buy NVDA into earnings"), Side::Buy);
    }

    #[test]
    fn heuristic_is_total() {
        for s in ["", "   ", "🚀🚀🚀", "\n\t", "SELL SELL SELL"] {
            let _ = heuristic_parse(s, "X", &[], None);
        }
    }

    #[test]
    fn heuristic_uses_news_and_confidence() {
        let news = vec![
            NewsItem { headline: "Beat on revenue".into(), sentiment: Some(0.6) },
            NewsItem { headline: "Guidance raised".into(), sentiment: None },
        ];
        let s = heuristic_parse("earnings run", "AAPL", &news, Some(0.83));
        assert_eq!(s.catalysts.len(), 2);
        assert_eq!(s.priority, 8);
        assert_eq!(s.tags, vec!["earnings".to_string()]);
    }

    // ---------- LLM path ----------

    #[test]
    fn llm_json_fills_defaults() {
        let p = NaturalLanguagePlayParser::new(CannedLlm(
            "Sure! ```json\n{\"title\": \"Fade the gap\", \"side\": \"sell\"}\n```",
        ));
        let s = p.parse("whatever", "AMD");
        assert_eq!(s.title, "Fade the gap");
        assert_eq!(s.side, Side::Sell);
        assert_eq!(s.priority, 5);
        assert_eq!(s.timeframe, "1-5 days");
        assert!(s.tags.is_empty());
    }

    #[test]
    fn llm_garbage_falls_back() {
        let p = NaturalLanguagePlayParser::new(CannedLlm("not json at all"));
        let s = p.parse("bearish on the open", "QQQ");
        assert_eq!(s.side, Side::Sell);
        assert_eq!(s.title, "QQQ sell play");
    }

    #[test]
    fn llm_priority_clamped() {
        let p = NaturalLanguagePlayParser::new(CannedLlm("{\"priority\": 42}"));
        assert_eq!(p.parse("x", "X").priority, 10);
    }

    #[test]
    fn llm_mistyped_fields_keep_the_rest() {
        let p = NaturalLanguagePlayParser::new(CannedLlm(
            r#"{"title": "Fade", "side": "sell", "timeframe": "2 weeks", "priority": "7",
                "tags": "momentum", "risks": [1, "gap up"]}"#,
        ));
        let s = p.parse("whatever", "AMD");
        assert_eq!(s.title, "Fade");
        assert_eq!(s.side, Side::Sell);
        assert_eq!(s.timeframe, "2 weeks");
        assert_eq!(s.priority, 7);
        assert_eq!(s.tags, vec!["momentum".to_string()]);
        assert_eq!(s.risks, vec!["gap up".to_string()]);

        let p = NaturalLanguagePlayParser::new(CannedLlm(r#"{"title": "T", "priority": 7.5}"#));
        assert_eq!(p.parse("x", "X").priority, 8);
        let p = NaturalLanguagePlayParser::new(CannedLlm(r#"{"title": "T", "priority": [3]}"#));
        assert_eq!(p.parse("x", "X").priority, 5);
    }

    // ---------- Timeframes ----------

    #[test]
    fn timeframe_hours() {
        assert_eq!(parse_timeframe_to_hours("1-2 weeks"), 168.0);
        assert_eq!(parse_timeframe_to_hours("3 months"), 2160.0);
        assert_eq!(parse_timeframe_to_hours(""), 24.0);
        assert_eq!(parse_timeframe_to_hours("1-5 days"), 24.0);
        assert_eq!(parse_timeframe_to_hours("two weeks"), 336.0);
        assert_eq!(parse_timeframe_to_hours("a few weeks"), 168.0);
        assert_eq!(parse_timeframe_to_hours("5-day hold"), 120.0);
    }

    #[test]
    fn absurd_timeframes_are_capped() {
        assert_eq!(parse_timeframe_to_hours("4000000000 days"), MAX_TIMEFRAME_HOURS);
        assert_eq!(parse_timeframe_to_hours("99999999999999999999 months"), MAX_TIMEFRAME_HOURS);
        assert_eq!(parse_timeframe_to_hours("12 months"), 8640.0);
    }

    #[test]
    fn timeframe_ignores_unanchored_numbers() {
        // "200" is a price, not a multiplier.
        assert_eq!(parse_timeframe_to_hours("target $200 within a week"), 168.0);
    }
}
