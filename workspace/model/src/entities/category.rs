use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait};

/// Budgeting bucket a category belongs to. Drives the 50/30/20 report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum CategoryKind {
    #[sea_orm(string_value = "Income")]
    Income,
    #[sea_orm(string_value = "Need")]
    Need,
    #[sea_orm(string_value = "Want")]
    Want,
    #[sea_orm(string_value = "Savings")]
    Savings,
}

/// Represents a category for transactions.
/// Categories are hierarchical (e.g., "Moradia" -> "Aluguel") and unique by name inside a tenant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub name: String,
    pub kind: CategoryKind,
    /// Self-referencing foreign key for hierarchical categories.
    pub parent_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "Cascade"
    )]
    Tenant,
    /// Defines the self-referencing relationship for parent category.
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Expands a category to include all its parent categories up to the root.
    /// Returns an ordered Vec from the current category to the root.
    pub async fn expand<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Model>, DbErr> {
        let mut categories = vec![self.clone()];
        let mut current_category = self.clone();

        while let Some(parent_id) = current_category.parent_id {
            // A corrupted hierarchy must not loop forever.
            if categories.iter().any(|c| c.id == parent_id) {
                break;
            }
            match Entity::find_by_id(parent_id).one(db).await? {
                Some(parent_category) => {
                    categories.push(parent_category.clone());
                    current_category = parent_category;
                }
                None => break,
            }
        }

        Ok(categories)
    }

    /// Gets all direct children of this category.
    pub async fn get_children<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TenantId.eq(self.tenant_id))
            .filter(Column::ParentId.eq(self.id))
            .all(db)
            .await
    }

    /// Returns true if making `new_parent_id` the parent of this category would close a cycle.
    pub async fn would_create_cycle<C: ConnectionTrait>(
        &self,
        db: &C,
        new_parent_id: i32,
    ) -> Result<bool, DbErr> {
        if new_parent_id == self.id {
            return Ok(true);
        }
        match Entity::find_by_id(new_parent_id).one(db).await? {
            Some(parent) => Ok(parent.expand(db).await?.iter().any(|c| c.id == self.id)),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::SqliteQueryBuilder;
    use sea_orm::{Database, DatabaseConnection, DbBackend, Schema, Set, Statement};

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        // Create the categories table only; tenants are not needed here
        let schema = Schema::new(DbBackend::Sqlite);
        let stmt = schema.create_table_from_entity(Entity);
        let statement =
            Statement::from_string(DbBackend::Sqlite, stmt.to_string(SqliteQueryBuilder));
        db.execute(statement).await.unwrap();

        db
    }

    async fn create_test_category(
        db: &DatabaseConnection,
        id: i32,
        name: &str,
        parent_id: Option<i32>,
    ) -> Model {
        let category = ActiveModel {
            id: Set(id),
            tenant_id: Set(1),
            name: Set(name.to_string()),
            kind: Set(CategoryKind::Need),
            parent_id: Set(parent_id),
        };

        category.insert(db).await.unwrap()
    }

    #[tokio::test]
    async fn test_expand_root_category() {
        let db = setup_test_db().await;

        let root_category = create_test_category(&db, 1, "Moradia", None).await;

        let expanded = root_category.expand(&db).await.unwrap();

        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].id, 1);
        assert_eq!(expanded[0].name, "Moradia");
        assert_eq!(expanded[0].parent_id, None);
    }

    #[tokio::test]
    async fn test_expand_multi_level_hierarchy() {
        let db = setup_test_db().await;

        create_test_category(&db, 1, "Despesas", None).await;
        create_test_category(&db, 2, "Alimentação", Some(1)).await;
        let subcategory = create_test_category(&db, 3, "Mercado", Some(2)).await;

        let expanded = subcategory.expand(&db).await.unwrap();

        let ids: Vec<i32> = expanded.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(expanded[2].name, "Despesas");
    }

    #[tokio::test]
    async fn test_get_children() {
        let db = setup_test_db().await;

        let root = create_test_category(&db, 1, "Root", None).await;
        let child1 = create_test_category(&db, 2, "Child1", Some(1)).await;
        let child2 = create_test_category(&db, 3, "Child2", Some(1)).await;
        create_test_category(&db, 4, "Grandchild", Some(2)).await;

        let children_of_root = root.get_children(&db).await.unwrap();
        assert_eq!(children_of_root.len(), 2);
        assert!(children_of_root.iter().any(|c| c.id == 2));
        assert!(children_of_root.iter().any(|c| c.id == 3));

        let children_of_child1 = child1.get_children(&db).await.unwrap();
        assert_eq!(children_of_child1.len(), 1);
        assert_eq!(children_of_child1[0].id, 4);

        assert!(child2.get_children(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_would_create_cycle() {
        let db = setup_test_db().await;

        let root = create_test_category(&db, 1, "Root", None).await;
        let child = create_test_category(&db, 2, "Child", Some(1)).await;
        create_test_category(&db, 3, "Other", None).await;

        assert!(root.would_create_cycle(&db, 2).await.unwrap());
        assert!(root.would_create_cycle(&db, 1).await.unwrap());
        assert!(!child.would_create_cycle(&db, 3).await.unwrap());
    }
}
