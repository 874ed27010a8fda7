use std::collections::HashMap;

use crate::domain::Template;

/// Priority of templates with no explicit or fallback rank. Sorts last.
pub const UNRANKED: u32 = u32::MAX;

/// Fallback priorities keyed by template code.
///
/// Templates without an explicit `priority` are ranked through this table;
/// codes it does not list are [`UNRANKED`].
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    ranks: HashMap<String, u32>,
}

impl PriorityTable {
    /// Empty table: every template without an explicit priority is unranked.
    pub fn new() -> Self {
        PriorityTable::default()
    }

    /// Build from `(code, rank)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        PriorityTable {
            ranks: pairs.into_iter().map(|(c, r)| (c.into(), r)).collect(),
        }
    }

    /// Ranking used by the desktop action bar.
    pub fn desktop() -> Self {
        PriorityTable::from_pairs([
            ("approve", 1),
            ("reject", 2),
            ("return", 3),
            ("claim", 4),
            ("transfer", 5),
            ("delegate", 6),
            ("unclaim", 7),
            ("suspend", 8),
            ("resume", 9),
            ("terminate", 10),
            ("view_history", 20),
            ("view_diagram", 21),
            ("print", 22),
        ])
    }

    /// Ranking used on mobile, where claim moves ahead of return.
    pub fn mobile() -> Self {
        PriorityTable::from_pairs([
            ("approve", 1),
            ("reject", 2),
            ("claim", 3),
            ("return", 4),
            ("transfer", 5),
            ("unclaim", 6),
            ("suspend", 7),
            ("resume", 8),
        ])
    }

    /// Set or override the rank of a code.
    pub fn insert(&mut self, code: impl Into<String>, rank: u32) {
        self.ranks.insert(code.into(), rank);
    }

    /// Fallback rank of a code.
    pub fn rank(&self, code: &str) -> u32 {
        self.ranks.get(code).copied().unwrap_or(UNRANKED)
    }

    /// Effective priority of a template: explicit, then fallback, then unranked.
    #[inline]
    pub fn priority_of(&self, template: &Template) -> u32 {
        template.priority.unwrap_or_else(|| self.rank(&template.code))
    }
}
