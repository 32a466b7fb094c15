use hysteria_core::{HysteriaError, HysteriaResult};

use super::qualify;
use crate::model::ModelMeta;
use crate::query::dialect::Dialect;

/// The join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// Generates JOIN clauses.
#[derive(Debug, Clone, Copy)]
pub struct JoinTemplate<'m> {
    dialect: Dialect,
    meta: &'m ModelMeta,
}

impl<'m> JoinTemplate<'m> {
    pub const fn new(dialect: Dialect, meta: &'m ModelMeta) -> Self {
        Self { dialect, meta }
    }

    /// `<KIND> JOIN <related> ON <primary> = <foreign>`.
    ///
    /// An undotted `primary_column` is qualified with the model's table, an
    /// undotted `foreign_column` with `related_table`.
    pub fn join(
        &self,
        kind: JoinKind,
        related_table: &str,
        primary_column: &str,
        foreign_column: &str,
    ) -> HysteriaResult<String> {
        if kind == JoinKind::Right && !self.dialect.supports_right_join() {
            return Err(HysteriaError::UnsupportedOperation(
                "RIGHT JOIN is not supported by sqlite".to_string(),
            ));
        }
        Ok(format!(
            "{} {related_table} ON {} = {}",
            kind.keyword(),
            qualify(self.meta, self.meta.table(), primary_column),
            qualify(self.meta, related_table, foreign_column)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::query::templates::fixtures::User;

    #[test]
    fn test_join_defaults_prefixes() {
        let t = JoinTemplate::new(Dialect::Postgres, User::meta());
        assert_eq!(
            t.join(JoinKind::Inner, "posts", "id", "userId").unwrap(),
            "INNER JOIN posts ON users.id = posts.user_id"
        );
    }

    #[test]
    fn test_join_dotted_references() {
        let t = JoinTemplate::new(Dialect::MySql, User::meta());
        assert_eq!(
            t.join(JoinKind::Left, "posts", "users.id", "posts.authorId").unwrap(),
            "LEFT JOIN posts ON users.id = posts.author_id"
        );
    }

    #[test]
    fn test_right_join_unsupported_on_sqlite() {
        let t = JoinTemplate::new(Dialect::Sqlite, User::meta());
        let err = t.join(JoinKind::Right, "posts", "id", "userId").unwrap_err();
        assert!(matches!(err, HysteriaError::UnsupportedOperation(_)));
        let t = JoinTemplate::new(Dialect::MySql, User::meta());
        assert!(t.join(JoinKind::Right, "posts", "id", "userId").is_ok());
    }
}
