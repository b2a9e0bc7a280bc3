//! Message templates.

use super::{Record, Store};
use chrono::Utc;
use wasend_core::error::WasendError;
use wasend_core::records::{Template, TemplateInput};
use wasend_core::template::extract_variables;

impl Record for Template {
    const KIND: &'static str = "template";
    const FILE: &'static str = "templates.json";

    fn id(&self) -> u64 {
        self.id
    }
}

fn category_or_default(category: &str) -> String {
    match category.trim() {
        "" => "general".to_string(),
        other => other.to_string(),
    }
}

impl Store {
    pub async fn list_templates(&self) -> Result<Vec<Template>, WasendError> {
        self.templates.list().await
    }

    pub async fn get_template(&self, id: u64) -> Result<Template, WasendError> {
        self.templates.get(id).await
    }

    /// Create a template. Variables come from the body unless given explicitly.
    pub async fn create_template(&self, input: TemplateInput) -> Result<Template, WasendError> {
        input.validate()?;
        let variables = input
            .variables
            .unwrap_or_else(|| extract_variables(&input.body));
        self.templates
            .insert(|id| Template {
                id,
                name: input.name.trim().to_string(),
                category: category_or_default(&input.category),
                body: input.body,
                variables,
                created_at: Utc::now(),
                updated_at: None,
            })
            .await
    }

    pub async fn update_template(
        &self,
        id: u64,
        input: TemplateInput,
    ) -> Result<Template, WasendError> {
        input.validate()?;
        let variables = input
            .variables
            .unwrap_or_else(|| extract_variables(&input.body));
        self.templates
            .update(id, |t| {
                t.name = input.name.trim().to_string();
                t.category = category_or_default(&input.category);
                t.body = input.body;
                t.variables = variables;
                t.updated_at = Some(Utc::now());
            })
            .await
    }

    pub async fn delete_template(&self, id: u64) -> Result<Template, WasendError> {
        self.templates.remove(id).await
    }
}
