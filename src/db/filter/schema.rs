//! Filterable schema
//!
//! The allow-list a caller filter is checked against. Every key a filter may
//! name is listed here as either a scalar column or a relation; anything else
//! is rejected while parsing.

/// A queryable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Article,
    User,
    Department,
    Category,
}

/// Storage type of a scalar column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Text,
    Bool,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Int => "an integer",
            ScalarKind::Text => "a string",
            ScalarKind::Bool => "a boolean",
        }
    }
}

/// A scalar column, addressed by its API field name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Name used in filters and responses
    pub field: &'static str,
    /// Name in SQL
    pub column: &'static str,
    pub kind: ScalarKind,
}

/// How many target rows a relation yields per source row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// How the target table is reached from the source row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// The source row holds the key: `target.id = source.<fk>`
    Owner { fk: &'static str },
    /// The target rows hold the key: `target.<fk> = source.id`
    Owned { fk: &'static str },
    /// A link table pairs the two ids
    Link {
        table: &'static str,
        source_key: &'static str,
        target_key: &'static str,
    },
}

/// A relation field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub field: &'static str,
    pub target: Model,
    pub cardinality: Cardinality,
    pub join: Join,
}

/// A field of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Scalar(Column),
    Relation(Relation),
}

const fn scalar(field: &'static str, column: &'static str, kind: ScalarKind) -> Field {
    Field::Scalar(Column { field, column, kind })
}

pub const ARTICLE_ID: Column = Column { field: "id", column: "id", kind: ScalarKind::Int };
pub const ARTICLE_PUBLISHED: Column = Column {
    field: "published",
    column: "published",
    kind: ScalarKind::Bool,
};

const ARTICLE_FIELDS: &[Field] = &[
    Field::Scalar(ARTICLE_ID),
    scalar("title", "title", ScalarKind::Text),
    scalar("body", "body", ScalarKind::Text),
    Field::Scalar(ARTICLE_PUBLISHED),
    scalar("createdById", "created_by_id", ScalarKind::Int),
    Field::Relation(Relation {
        field: "createdBy",
        target: Model::User,
        cardinality: Cardinality::ToOne,
        join: Join::Owner { fk: "created_by_id" },
    }),
    Field::Relation(Relation {
        field: "categories",
        target: Model::Category,
        cardinality: Cardinality::ToMany,
        join: Join::Link {
            table: "article_categories",
            source_key: "article_id",
            target_key: "category_id",
        },
    }),
];

const USER_FIELDS: &[Field] = &[
    scalar("id", "id", ScalarKind::Int),
    scalar("name", "name", ScalarKind::Text),
    scalar("email", "email", ScalarKind::Text),
    scalar("password", "password", ScalarKind::Text),
    scalar("resetToken", "reset_token", ScalarKind::Text),
    scalar("isAdmin", "is_admin", ScalarKind::Bool),
    Field::Relation(Relation {
        field: "articles",
        target: Model::Article,
        cardinality: Cardinality::ToMany,
        join: Join::Owned { fk: "created_by_id" },
    }),
    Field::Relation(Relation {
        field: "departments",
        target: Model::Department,
        cardinality: Cardinality::ToMany,
        join: Join::Link {
            table: "user_departments",
            source_key: "user_id",
            target_key: "department_id",
        },
    }),
];

const DEPARTMENT_FIELDS: &[Field] = &[
    scalar("id", "id", ScalarKind::Int),
    scalar("name", "name", ScalarKind::Text),
    Field::Relation(Relation {
        field: "users",
        target: Model::User,
        cardinality: Cardinality::ToMany,
        join: Join::Link {
            table: "user_departments",
            source_key: "department_id",
            target_key: "user_id",
        },
    }),
];

const CATEGORY_FIELDS: &[Field] = &[
    scalar("id", "id", ScalarKind::Int),
    scalar("name", "name", ScalarKind::Text),
    Field::Relation(Relation {
        field: "articles",
        target: Model::Article,
        cardinality: Cardinality::ToMany,
        join: Join::Link {
            table: "article_categories",
            source_key: "category_id",
            target_key: "article_id",
        },
    }),
];

impl Model {
    /// Model name as it appears in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Model::Article => "Article",
            Model::User => "User",
            Model::Department => "Department",
            Model::Category => "Category",
        }
    }

    /// Backing table
    pub fn table(&self) -> &'static str {
        match self {
            Model::Article => "articles",
            Model::User => "users",
            Model::Department => "departments",
            Model::Category => "categories",
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        match self {
            Model::Article => ARTICLE_FIELDS,
            Model::User => USER_FIELDS,
            Model::Department => DEPARTMENT_FIELDS,
            Model::Category => CATEGORY_FIELDS,
        }
    }

    /// Look up a field by its API name
    pub fn field(&self, name: &str) -> Option<Field> {
        self.fields()
            .iter()
            .copied()
            .find(|f| match f {
                Field::Scalar(c) => c.field == name,
                Field::Relation(r) => r.field == name,
            })
    }

    /// Look up a scalar column by its API name
    pub fn column(&self, name: &str) -> Option<Column> {
        match self.field(name)? {
            Field::Scalar(column) => Some(column),
            Field::Relation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        assert_eq!(Model::Article.column("published"), Some(ARTICLE_PUBLISHED));
        assert_eq!(
            Model::User.column("resetToken").map(|c| c.column),
            Some("reset_token")
        );
        assert!(Model::Article.column("createdBy").is_none());
        assert!(Model::Article.field("created_by_id").is_none());
        assert!(Model::Category.field("title").is_none());
    }

    #[test]
    fn test_every_relation_targets_a_model_with_an_id() {
        for model in [Model::Article, Model::User, Model::Department, Model::Category] {
            assert!(model.column("id").is_some(), "{} has no id", model.name());
            for field in model.fields() {
                if let Field::Relation(relation) = field {
                    assert!(relation.target.column("id").is_some());
                }
            }
        }
    }

    #[test]
    fn test_link_tables_are_symmetric() {
        let Some(Field::Relation(forward)) = Model::Article.field("categories") else {
            panic!("categories should be a relation");
        };
        let Some(Field::Relation(backward)) = Model::Category.field("articles") else {
            panic!("articles should be a relation");
        };

        match (forward.join, backward.join) {
            (
                Join::Link { table: t1, source_key: s1, target_key: k1 },
                Join::Link { table: t2, source_key: s2, target_key: k2 },
            ) => {
                assert_eq!(t1, t2);
                assert_eq!(s1, k2);
                assert_eq!(k1, s2);
            }
            _ => panic!("expected link joins"),
        }
    }
}
