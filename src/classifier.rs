//! Keyword classifiers for incoming captions.
//!
//! Everything here is a pure function of the text. The router uses
//! [`classify`]; the agent's tools reuse [`detect_emotions`] and
//! [`scan_sensitive_topics`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============ Sensitivity ============

/// (keywords, weight) per sensitive category. Weights of every matching
/// category are summed, so adding a category can only raise a score.
const SENSITIVITY_PATTERNS: &[(&[&str], f64)] = &[
    // money
    (&["钱", "工资", "借", "还钱", "贵", "money", "salary"], 0.3),
    // romance / marriage
    (&["结婚", "对象", "相亲", "分手", "marry", "boyfriend", "girlfriend"], 0.4),
    // health
    (&["身体", "生病", "医院", "检查", "hospital", "sick"], 0.4),
    // work stress
    (&["工作", "辞职", "老板", "加班", "overtime", "my boss"], 0.2),
    // body image
    (&["胖", "瘦", "减肥", "diet"], 0.3),
    // anger
    (&["吵", "生气", "不想理", "烦死", "angry"], 0.5),
];

const COMPLAINT_MARKERS: &[&str] = &["不想", "烦死", "累死", "受不了", "气死", "sick of"];
const CONFLICT_MARKERS: &[&str] = &["你怎么", "为什么", "总是", "每次都", "always", "every time"];
const POSITIVE_MARKERS: &[&str] = &["开心", "高兴", "太好了", "哈哈", "so happy"];
const MISSING_MARKERS: &[&str] = &["想你", "想念", "好久", "miss you"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Normal,
    Complaint,
    Conflict,
    Positive,
    Missing,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Normal => "normal",
            MessageType::Complaint => "complaint",
            MessageType::Conflict => "conflict",
            MessageType::Positive => "positive",
            MessageType::Missing => "missing",
        }
    }

    /// Complaints and accusations always go to the careful path.
    pub fn needs_escalation(&self) -> bool {
        matches!(self, MessageType::Complaint | MessageType::Conflict)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// 0.0..=1.0
    pub sensitivity: f64,
    pub message_type: MessageType,
}

pub fn classify(text: &str) -> Classification {
    Classification {
        sensitivity: sensitivity_score(text),
        message_type: detect_message_type(text),
    }
}

pub fn sensitivity_score(text: &str) -> f64 {
    let text = text.to_lowercase();
    let score: f64 = SENSITIVITY_PATTERNS
        .iter()
        .filter(|(words, _)| contains_any(&text, words))
        .map(|(_, weight)| weight)
        .sum();
    score.min(1.0)
}

/// First match wins: complaint, conflict, positive, missing.
pub fn detect_message_type(text: &str) -> MessageType {
    let text = text.to_lowercase();
    if contains_any(&text, COMPLAINT_MARKERS) {
        MessageType::Complaint
    } else if contains_any(&text, CONFLICT_MARKERS) {
        MessageType::Conflict
    } else if contains_any(&text, POSITIVE_MARKERS) {
        MessageType::Positive
    } else if contains_any(&text, MISSING_MARKERS) {
        MessageType::Missing
    } else {
        MessageType::Normal
    }
}

// ============ Emotions ============

const EMOTION_PATTERNS: &[(Emotion, &[&str])] = &[
    (Emotion::Happy, &["开心", "高兴", "太好了", "哈哈", "棒", "爱你"]),
    (Emotion::Sad, &["难过", "伤心", "哭", "不开心"]),
    (Emotion::Tired, &["累", "烦", "不想", "好困", "加班"]),
    (Emotion::Anxious, &["担心", "焦虑", "怎么办", "纠结"]),
    (Emotion::Angry, &["气死", "烦死", "生气", "不想理"]),
    (Emotion::Missing, &["想你", "想念", "想家", "好久不见"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Tired,
    Anxious,
    Angry,
    Missing,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Tired => "tired",
            Emotion::Anxious => "anxious",
            Emotion::Angry => "angry",
            Emotion::Missing => "missing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReport {
    pub primary_emotion: Emotion,
    pub secondary_emotion: Option<Emotion>,
    pub intensity: f64,
    pub needs_care: bool,
}

/// Primary is the first emotion (in table order) with any hit; secondary is
/// the last other one. Intensity grows with the primary's hit count.
pub fn detect_emotions(text: &str) -> EmotionReport {
    let mut primary = Emotion::Neutral;
    let mut secondary = None;
    let mut intensity = 0.3;

    for (emotion, words) in EMOTION_PATTERNS {
        let hits = words.iter().filter(|w| text.contains(*w)).count();
        if hits == 0 {
            continue;
        }
        if primary == Emotion::Neutral {
            primary = *emotion;
            intensity = (0.5 + hits as f64 * 0.2).min(1.0);
        } else {
            secondary = Some(*emotion);
        }
    }

    EmotionReport {
        primary_emotion: primary,
        secondary_emotion: secondary,
        intensity,
        needs_care: matches!(
            primary,
            Emotion::Sad | Emotion::Tired | Emotion::Anxious | Emotion::Angry
        ),
    }
}

// ============ Sensitive Topics ============

const TOPIC_PATTERNS: &[(&str, &[&str])] = &[
    ("health", &["身体", "生病", "医院", "检查", "吃药"]),
    ("money", &["钱", "工资", "借", "还", "贵"]),
    ("relationship", &["结婚", "对象", "分手", "相亲", "男朋友", "女朋友"]),
    ("work", &["辞职", "加班", "老板", "压力", "累死"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveTopics {
    pub has_sensitive: bool,
    /// category -> matched keywords
    pub categories: BTreeMap<String, Vec<String>>,
    pub recommendation: Option<String>,
}

pub fn scan_sensitive_topics(text: &str) -> SensitiveTopics {
    let categories: BTreeMap<String, Vec<String>> = TOPIC_PATTERNS
        .iter()
        .filter_map(|(category, words)| {
            let matches: Vec<String> = words
                .iter()
                .filter(|w| text.contains(*w))
                .map(|w| w.to_string())
                .collect();
            (!matches.is_empty()).then(|| (category.to_string(), matches))
        })
        .collect();

    let has_sensitive = !categories.is_empty();
    SensitiveTopics {
        has_sensitive,
        categories,
        recommendation: has_sensitive.then(|| "建议使用更温和、不带压力的语气".to_string()),
    }
}

pub(crate) fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generalizing_accusation_is_conflict() {
        for caption in ["你总是不理我", "每次都这样", "You ALWAYS forget to call"] {
            assert_eq!(detect_message_type(caption), MessageType::Conflict, "{caption}");
        }
    }

    #[test]
    fn test_complaint_outranks_conflict_and_positive() {
        // "烦死" is a complaint marker, "总是" a conflict one, "哈哈" positive.
        assert_eq!(detect_message_type("总是这样烦死了哈哈"), MessageType::Complaint);
        assert_eq!(detect_message_type("为什么不开心哈哈"), MessageType::Conflict);
    }

    #[test]
    fn test_positive_then_missing_then_normal() {
        assert_eq!(detect_message_type("今天好开心"), MessageType::Positive);
        assert_eq!(detect_message_type("好久没见了"), MessageType::Missing);
        assert_eq!(detect_message_type("今天吃了好吃的面"), MessageType::Normal);
    }

    #[test]
    fn test_sensitivity_sums_categories() {
        assert_eq!(sensitivity_score("今天天气不错"), 0.0);
        assert!((sensitivity_score("工资又少了") - 0.3).abs() < 1e-9);
        // romance + health
        assert!((sensitivity_score("相亲之前去医院检查") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_sensitivity_clamped() {
        let everything = "钱 结婚 医院 加班 减肥 生气";
        assert_eq!(sensitivity_score(everything), 1.0);
    }

    #[test]
    fn test_sensitivity_monotonic_under_supersets() {
        let additions = ["工资", "相亲", "生病", "辞职", "减肥", "吵架"];
        let mut text = String::from("周末回家");
        let mut previous = sensitivity_score(&text);
        for word in additions {
            text.push_str(word);
            let score = sensitivity_score(&text);
            assert!(score >= previous, "{text}: {score} < {previous}");
            previous = score;
        }
    }

    #[test]
    fn test_classify_scenario() {
        let c = classify("你总是不理我");
        assert_eq!(c.message_type, MessageType::Conflict);
        assert!(c.message_type.needs_escalation());
        assert_eq!(c.sensitivity, 0.0);
    }

    #[test]
    fn test_detect_emotions_primary_and_secondary() {
        let report = detect_emotions("加班好累，但是周末很开心");
        // happy comes first in table order
        assert_eq!(report.primary_emotion, Emotion::Happy);
        assert_eq!(report.secondary_emotion, Some(Emotion::Tired));
        assert!(!report.needs_care);

        let tired = detect_emotions("加班好累");
        assert_eq!(tired.primary_emotion, Emotion::Tired);
        assert!((tired.intensity - 0.9).abs() < 1e-9);
        assert!(tired.needs_care);
    }

    #[test]
    fn test_detect_emotions_neutral() {
        let report = detect_emotions("今天去公园了");
        assert_eq!(report.primary_emotion, Emotion::Neutral);
        assert_eq!(report.intensity, 0.3);
        assert!(!report.needs_care);
    }

    #[test]
    fn test_scan_sensitive_topics() {
        let found = scan_sensitive_topics("老板让我加班，工资还不涨");
        assert!(found.has_sensitive);
        assert_eq!(found.categories["work"], vec!["加班", "老板"]);
        assert_eq!(found.categories["money"], vec!["工资", "还"]);
        assert!(found.recommendation.is_some());

        let none = scan_sensitive_topics("晚饭吃了面条");
        assert!(!none.has_sensitive);
        assert!(none.recommendation.is_none());
    }
}
