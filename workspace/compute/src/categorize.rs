use model::entities::rule;
use model::entities::transaction::split_tags;
use tracing::{debug, trace};

/// What a matching rule assigns to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule_id: i32,
    pub category_id: i32,
    pub account_id: Option<i32>,
    pub tags: Vec<String>,
}

impl From<&rule::Model> for RuleMatch {
    fn from(rule: &rule::Model) -> Self {
        Self {
            rule_id: rule.id,
            category_id: rule.category_id,
            account_id: rule.account_id,
            tags: split_tags(rule.tags.as_deref()),
        }
    }
}

/// A pattern is usable when it has at least one non-whitespace character.
pub fn is_valid_pattern(pattern: &str) -> bool {
    !pattern.trim().is_empty()
}

/// Returns the first active rule in `rules` whose pattern occurs in
/// `description`, ignoring case. The slice order is the evaluation order.
pub fn first_match<'a>(description: &str, rules: &'a [rule::Model]) -> Option<&'a rule::Model> {
    let haystack = description.to_lowercase();
    rules.iter().find(|rule| {
        if !rule.active || !is_valid_pattern(&rule.pattern) {
            return false;
        }
        let matched = haystack.contains(&rule.pattern.trim().to_lowercase());
        trace!(rule_id = rule.id, pattern = %rule.pattern, matched, "Evaluated rule");
        matched
    })
}

/// A tenant's rule set in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct Categorizer {
    rules: Vec<rule::Model>,
}

impl Categorizer {
    /// Keeps the active rules with a usable pattern, ordered by `position` then `id`.
    pub fn new(rules: impl IntoIterator<Item = rule::Model>) -> Self {
        let mut rules: Vec<rule::Model> = rules
            .into_iter()
            .filter(|r| r.active && is_valid_pattern(&r.pattern))
            .collect();
        rules.sort_by_key(|r| (r.position, r.id));
        debug!("Prepared categorizer with {} rules", rules.len());
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[rule::Model] {
        &self.rules
    }

    pub fn categorize(&self, description: &str) -> Option<RuleMatch> {
        let matched = first_match(description, &self.rules).map(RuleMatch::from);
        match &matched {
            Some(m) => debug!(rule_id = m.rule_id, category_id = m.category_id, "Description matched rule"),
            None => trace!("No rule matched description"),
        }
        matched
    }
}
