//! Language model

use serde::Deserialize;

use super::resource::{ColumnValues, RecordInput, Resource};
use super::validation::{required_text, ValidationError};
use crate::db::entity::{ColumnDef, ColumnKind, Deletion, Entity, EntityDescriptor, IdStrategy};

pub static LANGUAGES: EntityDescriptor = EntityDescriptor {
    table: "languages",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ColumnKind::BigInt),
        ColumnDef::new("code", "code", ColumnKind::Text),
        ColumnDef::new("name", "name", ColumnKind::Text),
        ColumnDef::new("created_at", "createdAt", ColumnKind::Timestamp),
        ColumnDef::new("updated_at", "updatedAt", ColumnKind::Timestamp),
    ],
    deletion: Deletion::HardDeleteOnly,
    id_strategy: IdStrategy::AutoIncrement,
    version_column: None,
};

crate::sort_columns! {
    pub enum LanguageSort {
        Id => ("id", "id"),
        Code => ("code", "code"),
        Name => ("name", "name"),
    }
}

/// Spoken language a lobby is held in
pub struct Language;

impl Entity for Language {
    type Sort = LanguageSort;

    fn descriptor() -> &'static EntityDescriptor {
        &LANGUAGES
    }
}

impl Resource for Language {
    const NAME: &'static str = "Language";
    type Create = CreateLanguageInput;
    type Update = UpdateLanguageInput;
}

/// Language tags such as `en` or `pt-BR`, stored lowercase
fn language_code(value: &str) -> Result<String, ValidationError> {
    let code = required_text("code", value, 2, 8)?;
    if !code.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return Err(ValidationError::new(
            "code",
            "may only contain letters and '-'",
        ));
    }
    Ok(code.to_ascii_lowercase())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLanguageInput {
    pub code: String,
    pub name: String,
}

impl RecordInput for CreateLanguageInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        Ok(vec![
            ("code", language_code(&self.code)?.into()),
            ("name", required_text("name", &self.name, 1, 100)?.into()),
        ])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLanguageInput {
    pub code: Option<String>,
    pub name: Option<String>,
}

impl RecordInput for UpdateLanguageInput {
    fn into_values(self) -> Result<ColumnValues, ValidationError> {
        let mut values = ColumnValues::new();
        if let Some(code) = self.code {
            values.push(("code", language_code(&code)?.into()));
        }
        if let Some(name) = self.name {
            values.push(("name", required_text("name", &name, 1, 100)?.into()));
        }
        Ok(values)
    }
}
