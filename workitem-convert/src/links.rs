//! Absolute resource links beneath the configured API base URL.

use uuid::Uuid;
use workitem_config::EngineConfig;

#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.base_url())
    }

    fn href(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    pub fn work_item(&self, id: Uuid) -> String {
        self.href(&format!("workitems/{id}"))
    }

    pub fn work_item_children(&self, id: Uuid) -> String {
        format!("{}/children", self.work_item(id))
    }

    pub fn work_item_events(&self, id: Uuid) -> String {
        format!("{}/events", self.work_item(id))
    }

    pub fn work_item_links(&self, id: Uuid) -> String {
        format!("{}/links", self.work_item(id))
    }

    pub fn work_item_labels(&self, id: Uuid) -> String {
        format!("{}/labels", self.work_item(id))
    }

    pub fn work_item_comments(&self, id: Uuid) -> String {
        format!("{}/comments", self.work_item(id))
    }

    pub fn work_item_type(&self, id: Uuid) -> String {
        self.href(&format!("workitemtypes/{id}"))
    }

    pub fn space(&self, id: Uuid) -> String {
        self.href(&format!("spaces/{id}"))
    }

    pub fn user(&self, id: Uuid) -> String {
        self.href(&format!("users/{id}"))
    }

    pub fn iteration(&self, id: Uuid) -> String {
        self.href(&format!("iterations/{id}"))
    }

    pub fn area(&self, id: Uuid) -> String {
        self.href(&format!("areas/{id}"))
    }

    pub fn label(&self, id: Uuid) -> String {
        self.href(&format!("labels/{id}"))
    }

    pub fn codebase_edit(&self, id: Uuid) -> String {
        self.href(&format!("codebases/{id}/edit"))
    }
}
