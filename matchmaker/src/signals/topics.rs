use std::collections::BTreeSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::models::{clamp_score, Signal, NEUTRAL_SCORE};

use super::{InteractionSource, SignalExtractor};

/// Jaccard similarity is scaled by this before capping at 100.
pub const TOPIC_OVERLAP_BOOST: f64 = 1.5;

/// Fixed topic taxonomy detected in message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Topic {
    Ai,
    Startup,
    Business,
    Technology,
    Investment,
    Marketing,
    Design,
    Engineering,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Ai,
        Topic::Startup,
        Topic::Business,
        Topic::Technology,
        Topic::Investment,
        Topic::Marketing,
        Topic::Design,
        Topic::Engineering,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Ai => &[
                "AI",
                "ChatGPT",
                "LLM",
                "artificial intelligence",
                "machine learning",
                "人工知能",
                "機械学習",
            ],
            Self::Startup => &[
                "startup",
                "start-up",
                "founder",
                "venture",
                "スタートアップ",
                "起業",
                "ベンチャー",
                "創業",
            ],
            Self::Business => &[
                "business",
                "strategy",
                "management",
                "ビジネス",
                "事業",
                "経営",
                "戦略",
            ],
            Self::Technology => &["technology", "tech", "IT", "DX", "テクノロジー", "テック"],
            Self::Investment => &[
                "investment",
                "investor",
                "funding",
                "fundraising",
                "VC",
                "投資",
                "ファンディング",
                "資金調達",
            ],
            Self::Marketing => &[
                "marketing",
                "advertising",
                "PR",
                "マーケティング",
                "マーケ",
                "広告",
            ],
            Self::Design => &["design", "UI", "UX", "creative", "デザイン", "クリエイティブ"],
            Self::Engineering => &[
                "engineering",
                "engineer",
                "programming",
                "coding",
                "developer",
                "開発",
                "プログラミング",
                "エンジニア",
                "コーディング",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "AI",
            Self::Startup => "Startup",
            Self::Business => "Business",
            Self::Technology => "Technology",
            Self::Investment => "Investment",
            Self::Marketing => "Marketing",
            Self::Design => "Design",
            Self::Engineering => "Engineering",
        }
    }

    fn pattern(&self) -> String {
        const EDGE_START: &str = "(?:^|[^A-Za-z0-9_])";
        const EDGE_END: &str = "(?:$|[^A-Za-z0-9_])";

        let mut acronyms = Vec::new();
        let mut words = Vec::new();
        let mut others = Vec::new();
        for keyword in self.keywords() {
            let escaped = regex::escape(keyword);
            if !keyword.is_ascii() {
                others.push(escaped);
            } else if keyword.chars().all(|c| c.is_ascii_uppercase()) {
                acronyms.push(escaped);
            } else {
                words.push(format!("{escaped}s?"));
            }
        }

        let mut branches = Vec::new();
        if !acronyms.is_empty() {
            branches.push(format!("{EDGE_START}(?:{}){EDGE_END}", acronyms.join("|")));
        }
        if !words.is_empty() {
            branches.push(format!("(?i:{EDGE_START}(?:{}){EDGE_END})", words.join("|")));
        }
        branches.extend(others);
        branches.join("|")
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn matchers() -> &'static [(Topic, Regex)] {
    static MATCHERS: OnceLock<Vec<(Topic, Regex)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        Topic::ALL
            .iter()
            .map(|topic| (*topic, Regex::new(&topic.pattern()).unwrap()))
            .collect()
    })
}

/// Topics mentioned anywhere in `texts`.
pub fn extract_topics<'a>(texts: impl IntoIterator<Item = &'a str>) -> BTreeSet<Topic> {
    let mut found = BTreeSet::new();
    for text in texts {
        for (topic, regex) in matchers() {
            if !found.contains(topic) && regex.is_match(text) {
                found.insert(*topic);
            }
        }
    }
    found
}

/// `min(|common| / |union| × 1.5 × 100, 100)`; neutral when either side has
/// no topics.
pub fn topic_score(subject: &BTreeSet<Topic>, target: &BTreeSet<Topic>) -> u8 {
    if subject.is_empty() || target.is_empty() {
        return NEUTRAL_SCORE;
    }
    let common = subject.intersection(target).count() as f64;
    let union = subject.union(target).count() as f64;
    clamp_score(common / union * 100.0 * TOPIC_OVERLAP_BOOST)
}

/// Topic overlap between what each party has recently written about.
pub struct TopicSimilarity {
    source: InteractionSource,
    window: usize,
}

impl TopicSimilarity {
    pub fn new(source: InteractionSource, window: usize) -> Self {
        Self { source, window }
    }

    async fn topics_of(&self, member: &str) -> Result<BTreeSet<Topic>> {
        let messages = self.source.sent_by(member, self.window).await?;
        Ok(extract_topics(messages.iter().map(|m| m.content.as_str())))
    }
}

#[async_trait]
impl SignalExtractor for TopicSimilarity {
    fn signal(&self) -> Signal {
        Signal::Topics
    }

    async fn extract(&self, subject_id: &str, target_id: &str) -> Result<u8> {
        let (subject, target) = tokio::join!(self.topics_of(subject_id), self.topics_of(target_id));
        let (subject, target) = (subject?, target?);
        tracing::debug!(
            subject = subject_id,
            target = target_id,
            subject_topics = subject.len(),
            target_topics = target.len(),
            "Topic sets extracted"
        );
        Ok(topic_score(&subject, &target))
    }
}
