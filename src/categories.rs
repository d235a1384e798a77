// src/categories.rs
//! Topic categories and the keyword classifier.
//!
//! A text can belong to zero, one, or many categories — articles are often
//! multi-themed, so membership is deliberately non-exclusive. Matching is
//! case-insensitive substring search over a fixed keyword list per category.
//!
//! Classification sits behind the [`Classify`] trait so the selection loop
//! does not care how labels are produced; a smarter (embedding-based)
//! classifier can be swapped in later without touching callers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of topic categories tracked by the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Price,
    Innovation,
    Adoption,
    Regulation,
    Security,
    Defi,
    Infrastructure,
    Social,
}

impl Category {
    /// All categories, in a stable order.
    pub const ALL: [Category; 8] = [
        Category::Price,
        Category::Innovation,
        Category::Adoption,
        Category::Regulation,
        Category::Security,
        Category::Defi,
        Category::Infrastructure,
        Category::Social,
    ];

    /// Keywords whose presence (as a lower-case substring) puts a text into
    /// this category.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Price => &[
                "price", "surge", "$", "rally", "market", "ath", "high", "low", "dump", "pump",
            ],
            Category::Innovation => &[
                "launch", "update", "protocol", "tech", "scaling", "develop", "release",
            ],
            Category::Adoption => &[
                "adopt",
                "user",
                "integration",
                "partnership",
                "mainstream",
                "institutional",
            ],
            Category::Regulation => &[
                "regulation", "law", "compliance", "legal", "license", "govern",
            ],
            Category::Security => &[
                "hack", "scam", "security", "protect", "risk", "vulnerability",
            ],
            Category::Defi => &["defi", "yield", "stake", "liquidity", "amm", "swap"],
            Category::Infrastructure => &[
                "layer2", "scaling", "network", "chain", "bridge", "protocol",
            ],
            Category::Social => &["community", "governance", "dao", "vote", "proposal"],
        }
    }

    /// Lowercase name matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Price => "price",
            Category::Innovation => "innovation",
            Category::Adoption => "adoption",
            Category::Regulation => "regulation",
            Category::Security => "security",
            Category::Defi => "defi",
            Category::Infrastructure => "infrastructure",
            Category::Social => "social",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability interface for topic classification.
pub trait Classify: Send + Sync {
    /// Map free text onto the category set. Empty text yields the empty set.
    fn classify(&self, text: &str) -> BTreeSet<Category>;
}

/// Keyword-membership classifier. Stateless and pure.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classify for KeywordClassifier {
    fn classify(&self, text: &str) -> BTreeSet<Category> {
        let lower = text.to_lowercase();
        let mut out = BTreeSet::new();
        if lower.is_empty() {
            return out;
        }
        for cat in Category::ALL {
            if cat.keywords().iter().any(|kw| lower.contains(kw)) {
                out.insert(cat);
            }
        }
        out
    }
}
