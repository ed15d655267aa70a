/// Score bonus per matched trigger, rewarding several hits inside one category.
const MULTI_MATCH_BONUS: f64 = 0.1;

/// Secondary categories scoring at least this fraction of the top one are kept.
const SECONDARY_RATIO: f64 = 0.8;

/// Returned when nothing in the goal text matches.
pub const FALLBACK_KEYWORDS: [&str; 2] = ["단기저축", "안전자산"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePreference {
    Short,
    Medium,
    Long,
}

impl TimePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PurposeCategory {
    /// Category label; doubles as a purpose tag in the catalog.
    pub label: &'static str,
    pub triggers: &'static [&'static str],
    pub related: &'static [&'static str],
    pub weight: f64,
    pub time_preference: TimePreference,
}

pub const DEFAULT_PURPOSES: &[PurposeCategory] = &[
    PurposeCategory {
        label: "여행",
        triggers: &["여행", "휴가", "해외", "국내여행", "배낭여행", "신혼여행", "travel", "trip", "vacation"],
        related: &["단기저축", "안전자산"],
        weight: 0.9,
        time_preference: TimePreference::Short,
    },
    PurposeCategory {
        label: "결혼",
        triggers: &["결혼", "웨딩", "혼인", "신혼", "예식", "wedding", "marriage"],
        related: &["결혼자금", "단기저축"],
        weight: 0.95,
        time_preference: TimePreference::Medium,
    },
    PurposeCategory {
        label: "내집마련",
        triggers: &["집", "주택", "부동산", "아파트", "전세", "매매", "house", "apartment"],
        related: &["주택청약", "장기저축"],
        weight: 1.0,
        time_preference: TimePreference::Long,
    },
    PurposeCategory {
        label: "교육",
        triggers: &["교육", "학비", "공부", "대학", "유학", "자격증", "tuition", "education"],
        related: &["교육자금", "안전자산"],
        weight: 0.85,
        time_preference: TimePreference::Medium,
    },
    PurposeCategory {
        label: "창업",
        triggers: &["창업", "사업", "스타트업", "개업", "자영업", "startup", "business"],
        related: &["창업자금", "재산증식"],
        weight: 0.8,
        time_preference: TimePreference::Medium,
    },
    PurposeCategory {
        label: "노후준비",
        triggers: &["노후", "은퇴", "연금", "퇴직", "retire", "pension"],
        related: &["노후자금", "장기저축"],
        weight: 1.0,
        time_preference: TimePreference::Long,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurposeMatch {
    pub label: &'static str,
    pub score: f64,
    pub time_preference: TimePreference,
}

/// Ordered, de-duplicated keyword set plus the category matches it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PurposeKeywords {
    keywords: Vec<&'static str>,
    matches: Vec<PurposeMatch>,
}

impl PurposeKeywords {
    pub fn keywords(&self) -> &[&'static str] {
        &self.keywords
    }

    /// Matched categories, best first. Empty when the fallback set was used.
    pub fn matches(&self) -> &[PurposeMatch] {
        &self.matches
    }

    pub fn is_fallback(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| *k == keyword)
    }

    /// Substring containment in either direction. Short keywords can over-match.
    pub fn partially_matches(&self, tag: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| tag.contains(k) || k.contains(tag))
    }

    pub fn top_time_preference(&self) -> Option<TimePreference> {
        self.matches.first().map(|m| m.time_preference)
    }

    fn push(&mut self, keyword: &'static str) {
        if !self.contains(keyword) {
            self.keywords.push(keyword);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PurposeExtractor {
    table: &'static [PurposeCategory],
}

impl Default for PurposeExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PURPOSES)
    }
}

impl PurposeExtractor {
    pub fn new(table: &'static [PurposeCategory]) -> Self {
        Self { table }
    }

    pub fn extract(&self, goal_description: &str) -> PurposeKeywords {
        let goal = goal_description.to_lowercase();

        let mut matches: Vec<PurposeMatch> = Vec::new();
        if !goal.trim().is_empty() {
            for category in self.table {
                let match_count = category
                    .triggers
                    .iter()
                    .filter(|t| goal.contains(**t))
                    .count() as f64;
                let score = match_count * category.weight + match_count * MULTI_MATCH_BONUS;
                if score > 0.0 {
                    matches.push(PurposeMatch {
                        label: category.label,
                        score,
                        time_preference: category.time_preference,
                    });
                }
            }
        }

        // Stable: equal scores keep table order.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut out = PurposeKeywords {
            keywords: Vec::new(),
            matches: Vec::new(),
        };

        let Some(top) = matches.first().copied() else {
            for keyword in FALLBACK_KEYWORDS {
                out.push(keyword);
            }
            return out;
        };

        let threshold = top.score * SECONDARY_RATIO;
        for m in matches.iter().filter(|m| m.score >= threshold) {
            out.push(m.label);
            if let Some(category) = self.table.iter().find(|c| c.label == m.label) {
                for keyword in category.related {
                    out.push(*keyword);
                }
            }
        }

        out.matches = matches;
        out
    }
}
