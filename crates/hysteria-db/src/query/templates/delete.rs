use super::SqlFragment;
use crate::model::ModelMeta;

/// Generates DELETE statements. The statement is the same in every
/// dialect.
#[derive(Debug, Clone, Copy)]
pub struct DeleteTemplate<'m> {
    meta: &'m ModelMeta,
}

impl<'m> DeleteTemplate<'m> {
    pub const fn new(meta: &'m ModelMeta) -> Self {
        Self { meta }
    }

    /// `DELETE FROM <table> <where>`. `filter` is a complete WHERE clause
    /// or empty.
    pub fn delete(&self, filter: &SqlFragment) -> SqlFragment {
        let mut sql = format!("DELETE FROM {}", self.meta.table());
        if !filter.is_empty() {
            sql.push(' ');
            sql.push_str(&filter.sql);
        }
        SqlFragment::new(sql, filter.params.clone())
    }
}
