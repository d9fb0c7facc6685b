use std::collections::BTreeMap;

use aho_corasick::AhoCorasick;

use crate::corpus::KeywordFile;
use crate::error::Result;
use crate::helpers::{round1, token_bounded};

/// One label family's scored ranking, plus the derived primary.
#[derive(Debug, Clone)]
pub(crate) struct FamilyScores {
    /// Label -> percentage, one decimal place. Every configured label is
    /// present so downstream consumers always see the full ranking.
    pub scores: BTreeMap<String, f64>,
    pub primary: Option<String>,
    pub confidence: f64,
}

/// Weighted-keyword classifier: one case-insensitive Aho-Corasick automaton
/// over every keyword of every label in the family.
///
/// Each automaton pattern carries `(label index, keyword_weight x
/// category_weight)`; a single pass over the document accumulates weights
/// per label, and scores are converted to percentages afterwards.
#[derive(Debug)]
pub(crate) struct KeywordClassifier {
    ac: AhoCorasick,
    /// Parallel to the automaton's pattern IDs.
    weights: Vec<(usize, f64)>,
    labels: Vec<String>,
}

impl KeywordClassifier {
    pub fn build(file: KeywordFile) -> Result<Self> {
        let mut labels = Vec::new();
        let mut patterns: Vec<String> = Vec::new();
        let mut weights = Vec::new();

        for (label, category) in file {
            let label_idx = labels.len();
            labels.push(label);
            for (keyword, kw_weight) in category.keywords {
                weights.push((label_idx, kw_weight * category.weight));
                patterns.push(keyword);
            }
        }

        let ac = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&patterns)?;

        Ok(Self {
            ac,
            weights,
            labels,
        })
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.weights.len()
    }

    /// Score `text` across the whole family in one automaton pass.
    ///
    /// Overlapping hits all count (the automaton is shared by every label,
    /// so `safety` and `workplace safety` both accumulate when the longer
    /// phrase occurs). Matches that are not whole tokens are discarded.
    pub fn classify(&self, text: &str) -> FamilyScores {
        let mut accum = vec![0.0f64; self.labels.len()];

        for mat in self.ac.find_overlapping_iter(text) {
            if !token_bounded(text, mat.start(), mat.end()) {
                continue;
            }
            let (label_idx, weight) = self.weights[mat.pattern().as_usize()];
            accum[label_idx] += weight;
        }

        let total: f64 = accum.iter().sum();
        let mut scores = BTreeMap::new();
        for (idx, label) in self.labels.iter().enumerate() {
            let pct = if total > 0.0 {
                round1(accum[idx] / total * 100.0)
            } else {
                0.0
            };
            scores.insert(label.clone(), pct);
        }

        // Primary: highest score; ties resolve to the lexicographically
        // smallest label, which BTreeMap iteration order gives us for free.
        let mut primary = None;
        let mut confidence = 0.0;
        if total > 0.0 {
            for (label, &pct) in &scores {
                if pct > confidence {
                    confidence = pct;
                    primary = Some(label.clone());
                }
            }
        }

        FamilyScores {
            scores,
            primary,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::KeywordFile;

    fn classifier(yaml: &str) -> KeywordClassifier {
        let file: KeywordFile = serde_yaml::from_str(yaml).unwrap();
        KeywordClassifier::build(file).unwrap()
    }

    const FAMILY: &str = r#"
safety:
  weight: 2.0
  keywords:
    hazard: 1.0
    handrail: 1.5
finance:
  keywords:
    revenue: 1.0
    invoice: 1.0
"#;

    #[test]
    fn scores_sum_to_one_hundred() {
        let c = classifier(FAMILY);
        let out = c.classify("The hazard near the handrail was reported with the revenue data.");
        let sum: f64 = out.scores.values().sum();
        assert!((sum - 100.0).abs() < 0.2, "sum was {sum}");
        assert_eq!(out.primary.as_deref(), Some("safety"));
        // safety: (1.0 + 1.5) * 2.0 = 5.0 of 6.0 total.
        assert!((out.confidence - 83.3).abs() < 0.1);
    }

    #[test]
    fn empty_input_yields_zeroes_and_null_primary() {
        let c = classifier(FAMILY);
        let out = c.classify("");
        assert!(out.scores.values().all(|&v| v == 0.0));
        assert_eq!(out.scores.len(), 2);
        assert!(out.primary.is_none());
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn keyword_matching_is_whole_token() {
        let c = classifier(FAMILY);
        // `hazardous` must not count as `hazard`.
        let out = c.classify("hazardous but only revenue counts");
        assert_eq!(out.primary.as_deref(), Some("finance"));
    }

    #[test]
    fn ties_resolve_lexicographically() {
        let c = classifier(
            "beta:\n  keywords:\n    shared: 1.0\nalpha:\n  keywords:\n    shared: 1.0\n",
        );
        // Both labels score from the same keyword occurrence count.
        let out = c.classify("shared shared");
        assert_eq!(out.primary.as_deref(), Some("alpha"));
    }

    #[test]
    fn case_insensitive_matching() {
        let c = classifier(FAMILY);
        let out = c.classify("HAZARD HANDRAIL");
        assert_eq!(out.primary.as_deref(), Some("safety"));
    }
}
