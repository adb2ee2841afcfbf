//! Template-based help generation
//!
//! Suggestions come from fixed per-subject, per-confusion-band templates.
//! They are ranked by simple keyword relevance to the confusion level and
//! subject, then truncated to the configured count. A bounded history of
//! answers backs the statistics endpoint.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::SessionId;

use super::{HelpError, HelpGenerator, HelpRequest};

/// Confusion band used to pick templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfusionCategory {
    Low,
    Medium,
    High,
}

impl ConfusionCategory {
    /// `< 0.3` low, `< 0.7` medium, otherwise high.
    pub fn from_level(level: f64) -> Self {
        if level < 0.3 {
            ConfusionCategory::Low
        } else if level < 0.7 {
            ConfusionCategory::Medium
        } else {
            ConfusionCategory::High
        }
    }
}

/// One answered request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRecord {
    pub session_id: SessionId,
    pub confusion_level: f64,
    pub subject: String,
    pub suggestions: Vec<String>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpStatistics {
    pub total: usize,
    pub average_confusion_level: f64,
    pub max_confusion_level: f64,
    pub subjects: Vec<String>,
}

pub struct TemplateHelpGenerator {
    max_suggestions: usize,
    history_len: usize,
    history: Mutex<VecDeque<HelpRecord>>,
}

impl TemplateHelpGenerator {
    pub fn new(max_suggestions: usize, history_len: usize) -> Self {
        Self {
            max_suggestions: max_suggestions.max(1),
            history_len: history_len.max(1),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Template lines for a subject and category. Unknown subjects use `general`.
    pub fn templates(subject: &str, category: ConfusionCategory) -> &'static [&'static str] {
        use ConfusionCategory::{High, Low, Medium};
        match (subject, category) {
            ("mathematics", Low) => &[
                "You're doing well! Take your time with each step.",
                "Consider double-checking your work so far.",
                "Try writing out intermediate steps clearly.",
            ],
            ("mathematics", Medium) => &[
                "Break this problem into smaller steps.",
                "Review the relevant formulas or concepts.",
                "Try working through a similar, simpler example first.",
            ],
            ("mathematics", High) => &[
                "Take a step back and identify what the problem is asking.",
                "Look for patterns or keywords that indicate the approach needed.",
                "Consider reviewing the underlying concepts before continuing.",
            ],
            ("programming", Low) => &[
                "Good progress! Consider adding comments to clarify your logic.",
                "Test your code incrementally as you build.",
                "Think about edge cases for your solution.",
            ],
            ("programming", Medium) => &[
                "Break down the problem into smaller functions.",
                "Use print statements or a debugger to trace execution.",
                "Review the documentation for methods you're using.",
            ],
            ("programming", High) => &[
                "Start with pseudocode to plan your approach.",
                "Look for similar examples or patterns.",
                "Consider asking for help with the specific concept you're stuck on.",
            ],
            (_, Low) => &[
                "You're on the right track! Keep going.",
                "Take a moment to organize your thoughts.",
                "Consider reviewing what you've learned so far.",
            ],
            (_, Medium) => &[
                "Try explaining the problem to yourself out loud.",
                "Look for connections to concepts you already know.",
                "Take a short break and come back with fresh eyes.",
            ],
            (_, High) => &[
                "Don't worry, confusion is part of learning!",
                "Try to identify exactly what's confusing you.",
                "Consider seeking help from a teacher or peer.",
            ],
        }
    }

    fn relevance(suggestion: &str, level: f64, subject: &str) -> u32 {
        let lower = suggestion.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        let mut score = 0;
        match ConfusionCategory::from_level(level) {
            ConfusionCategory::High if has_any(&["break", "step", "simpler"]) => score += 2,
            ConfusionCategory::Low if has_any(&["double-check", "test", "consider"]) => score += 2,
            _ => {}
        }
        match subject {
            "mathematics" if has_any(&["formula", "equation", "calculate"]) => score += 1,
            "programming" if has_any(&["debug", "code", "function"]) => score += 1,
            _ => {}
        }
        score
    }

    /// Deduplicate, rank by relevance (stable), keep the top N.
    pub fn rank(&self, candidates: &[&str], level: f64, subject: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<(&str, u32)> = candidates
            .iter()
            .copied()
            .filter(|s| seen.insert(*s))
            .map(|s| (s, Self::relevance(s, level, subject)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(self.max_suggestions)
            .map(|(s, _)| s.to_string())
            .collect()
    }

    fn record(&self, entry: HelpRecord) {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.len() == self.history_len {
            history.pop_front();
        }
        history.push_back(entry);
    }

    /// Most recent `count` answers, oldest first.
    pub fn history(&self, count: usize) -> Vec<HelpRecord> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let skip = history.len().saturating_sub(count);
        history.iter().skip(skip).cloned().collect()
    }

    /// `None` until the first answer.
    pub fn statistics(&self) -> Option<HelpStatistics> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if history.is_empty() {
            return None;
        }
        let levels: Vec<f64> = history.iter().map(|h| h.confusion_level).collect();
        let mut subjects: Vec<String> = history.iter().map(|h| h.subject.clone()).collect();
        subjects.sort();
        subjects.dedup();
        Some(HelpStatistics {
            total: history.len(),
            average_confusion_level: levels.iter().sum::<f64>() / levels.len() as f64,
            max_confusion_level: levels.iter().copied().fold(0.0, f64::max),
            subjects,
        })
    }
}

#[async_trait]
impl HelpGenerator for TemplateHelpGenerator {
    async fn generate(&self, request: &HelpRequest) -> Result<Vec<String>, HelpError> {
        let subject = request.subject();
        let category = ConfusionCategory::from_level(request.confusion_level);
        let suggestions = self.rank(
            Self::templates(subject, category),
            request.confusion_level,
            subject,
        );

        self.record(HelpRecord {
            session_id: request.session_id,
            confusion_level: request.confusion_level,
            subject: subject.to_string(),
            suggestions: suggestions.clone(),
            generated_at: chrono::Utc::now(),
        });
        Ok(suggestions)
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(level: f64, subject: &str) -> HelpRequest {
        HelpRequest {
            session_id: SessionId::new(),
            confusion_level: level,
            context: json!({ "subject": subject }),
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(ConfusionCategory::from_level(0.1), ConfusionCategory::Low);
        assert_eq!(ConfusionCategory::from_level(0.3), ConfusionCategory::Medium);
        assert_eq!(ConfusionCategory::from_level(0.7), ConfusionCategory::High);
    }

    #[tokio::test]
    async fn test_high_confusion_math_ranks_step_advice_first() {
        let generator = TemplateHelpGenerator::new(3, 20);
        let out = generator.generate(&request(0.9, "mathematics")).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "Take a step back and identify what the problem is asking.");
    }

    #[tokio::test]
    async fn test_unknown_subject_falls_back_to_general() {
        let generator = TemplateHelpGenerator::new(2, 20);
        let out = generator.generate(&request(0.5, "astrology")).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(TemplateHelpGenerator::templates("general", ConfusionCategory::Medium)
            .contains(&out[0].as_str()));
    }

    #[test]
    fn test_rank_dedups_and_prefers_relevant() {
        let generator = TemplateHelpGenerator::new(3, 20);
        let ranked = generator.rank(
            &["Look around.", "Look around.", "Debug the function."],
            0.5,
            "programming",
        );
        assert_eq!(ranked, vec!["Debug the function.", "Look around."]);
    }

    #[tokio::test]
    async fn test_history_bounded_and_statistics() {
        let generator = TemplateHelpGenerator::new(3, 2);
        assert!(generator.statistics().is_none());
        for level in [0.2, 0.8, 0.9] {
            generator.generate(&request(level, "general")).await.unwrap();
        }
        assert_eq!(generator.history(10).len(), 2);
        let stats = generator.statistics().unwrap();
        assert_eq!(stats.total, 2);
        assert!((stats.average_confusion_level - 0.85).abs() < 1e-12);
        assert_eq!(stats.max_confusion_level, 0.9);
        assert_eq!(stats.subjects, vec!["general"]);
    }
}
