//! Append-only comment list for a single incident, displayed newest first.

use chrono::{DateTime, Utc};
use log::{log, Level};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    schema::model::Comment,
    utils::{
        is_valid_author, is_valid_content, is_valid_phone, non_blank, ValidationErrors,
        AUTHOR_TOO_SHORT, CONTENT_TOO_SHORT, PHONE_TOO_SHORT,
    },
};

pub const EMPTY_LEDGER_MESSAGE: &str = "No hay comentarios aún. ¡Sé el primero en comentar!";

#[derive(Deserialize, Clone, Debug, Default, ToSchema)]
pub struct NewComment {
    pub author: String,
    pub phone: String,
    #[serde(default)]
    pub dni: Option<String>,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if !is_valid_author(&self.author) {
            errors.add("author", AUTHOR_TOO_SHORT);
        }
        if !is_valid_phone(&self.phone) {
            errors.add("phone", PHONE_TOO_SHORT);
        }
        if !is_valid_content(&self.content) {
            errors.add("content", CONTENT_TOO_SHORT);
        }
        errors.into_result()
    }
}

#[derive(Clone, Debug)]
pub struct CommentLedger {
    incident_id: u64,
    // insertion order, oldest first
    comments: Vec<Comment>,
    next_id: u64,
}

impl CommentLedger {
    pub fn new(incident_id: u64) -> Self {
        Self {
            incident_id,
            comments: Vec::new(),
            next_id: 1,
        }
    }

    /// Seeds the ledger with comments given newest first.
    pub fn with_comments(incident_id: u64, newest_first: Vec<Comment>) -> Self {
        let next_id = newest_first.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let mut comments = newest_first;
        comments.reverse();
        Self {
            incident_id,
            comments,
            next_id,
        }
    }

    pub fn incident_id(&self) -> u64 {
        self.incident_id
    }

    /// Validates and prepends a comment. Ids come from a sequence that never
    /// hands out the same value twice for this incident.
    pub fn add_comment(
        &mut self,
        new: NewComment,
        now: DateTime<Utc>,
    ) -> Result<&Comment, ValidationErrors> {
        new.validate()?;
        let comment = Comment {
            id: self.next_id,
            incident_id: self.incident_id,
            author: new.author.trim().to_string(),
            phone: new.phone.trim().to_string(),
            dni: non_blank(new.dni),
            content: new.content.trim().to_string(),
            created_at: now,
        };
        self.next_id += 1;
        log!(
            Level::Info,
            "Added comment {} to incident {}",
            comment.id,
            self.incident_id
        );
        self.comments.push(comment);
        Ok(&self.comments[self.comments.len() - 1])
    }

    /// Newest first.
    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn heading(&self) -> String {
        format!("Comentarios ({})", self.len())
    }
}
