//! Models and schema shared by the SQLite integration tests.

#![allow(dead_code)]

use std::sync::LazyLock;

use hysteria_core::{DataSourceInput, DataSourceSettings};
use hysteria_db::{Column, Model, ModelMeta, Record};
use hysteria_db_backends::{SqlDataSource, SqliteBackend};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_name TEXT NOT NULL,
        email TEXT,
        password TEXT,
        deleted_at TEXT
    )",
    "CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        score INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE tags (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
    "CREATE TABLE user_tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL
    )",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub user_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posts: Vec<Post>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl User {
    pub fn named(name: &str) -> Self {
        Self {
            user_name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            password: Some("hunter2".to_string()),
            ..Self::default()
        }
    }
}

impl Model for User {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::builder("User")
                .column(Column::new("id").primary_key())
                .column(Column::new("userName"))
                .column(Column::new("email"))
                .column(Column::new("password").hidden())
                .column(Column::new("deletedAt"))
                .has_many::<Post>("posts", "userId")
                .many_to_many::<Tag>("tags", "user_tags", "userId")
                .dynamic_column("displayName", |record: &Record| {
                    json!(format!(
                        "@{}",
                        record.get("userName").and_then(|v| v.as_str()).unwrap_or_default()
                    ))
                })
                .build()
                .expect("valid user metadata")
        });
        &META
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

impl Post {
    pub fn new(user_id: i64, title: &str, score: i64) -> Self {
        Self {
            user_id,
            title: title.to_string(),
            score,
            ..Self::default()
        }
    }
}

impl Model for Post {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::builder("Post")
                .column(Column::new("id").primary_key())
                .column(Column::new("userId"))
                .column(Column::new("title"))
                .column(Column::new("score"))
                .belongs_to::<User>("user", "userId")
                .build()
                .expect("valid post metadata")
        });
        &META
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,
}

impl Model for Tag {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::builder("Tag")
                .column(Column::new("id").primary_key())
                .column(Column::new("name"))
                .many_to_many::<User>("users", "user_tags", "tagId")
                .build()
                .expect("valid tag metadata")
        });
        &META
    }
}

/// A fresh in-memory data source with the schema applied.
pub async fn data_source() -> SqlDataSource {
    let settings =
        DataSourceSettings::resolve_with(DataSourceInput::sqlite_memory(), |_| None).unwrap();
    let backend = SqliteBackend::open(":memory:").unwrap();
    let ds = SqlDataSource::from_backend(settings, Box::new(backend));
    for statement in SCHEMA {
        ds.executor().execute_sql(statement, &[]).await.unwrap();
    }
    ds
}
