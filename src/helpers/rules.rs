use compute::categorize::{Categorizer, RuleMatch};
use model::entities::{account, rule, transaction};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, warn};

/// What a rule match changes on a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub rule_id: i32,
    pub category_id: i32,
    pub account_id: i32,
    pub tags: Option<String>,
}

/// Loads the tenant's rules in evaluation order.
pub async fn load_categorizer<C: ConnectionTrait>(db: &C, tenant_id: i32) -> Result<Categorizer, DbErr> {
    let rules = rule::Entity::find()
        .filter(rule::Column::TenantId.eq(tenant_id))
        .filter(rule::Column::Active.eq(true))
        .order_by_asc(rule::Column::Position)
        .order_by_asc(rule::Column::Id)
        .all(db)
        .await?;
    Ok(Categorizer::new(rules))
}

/// Adds `extra` to the stored tag string, keeping the existing order and skipping duplicates.
pub fn merge_tags(existing: Option<&str>, extra: &[String]) -> Option<String> {
    let mut tags = transaction::split_tags(existing);
    for tag in extra {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.clone());
        }
    }
    transaction::join_tags(&tags)
}

/// Resolves a rule match against a transaction's current account and tags.
///
/// A rule account that no longer belongs to the tenant is ignored.
pub async fn assignment_for<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    matched: &RuleMatch,
    account_id: i32,
    tags: Option<&str>,
) -> Result<Assignment, DbErr> {
    let account_id = match matched.account_id {
        Some(target) => {
            let exists = account::Entity::find_by_id(target)
                .filter(account::Column::TenantId.eq(tenant_id))
                .one(db)
                .await?
                .is_some();
            if exists {
                target
            } else {
                warn!(
                    rule_id = matched.rule_id,
                    "Rule points at account {} outside tenant {}, keeping {}",
                    target,
                    tenant_id,
                    account_id
                );
                account_id
            }
        }
        None => account_id,
    };

    let assignment = Assignment {
        rule_id: matched.rule_id,
        category_id: matched.category_id,
        account_id,
        tags: merge_tags(tags, &matched.tags),
    };
    debug!(?assignment, "Resolved rule assignment");
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_tags() {
        let extra = vec!["mobilidade".to_string(), "Work".to_string()];
        assert_eq!(
            merge_tags(Some("work, viagem"), &extra),
            Some("work,viagem,mobilidade".to_string())
        );
        assert_eq!(merge_tags(None, &[]), None);
        assert_eq!(merge_tags(None, &extra), Some("mobilidade,Work".to_string()));
    }
}
