use crate::models::Category;
use crate::storage::{Storage, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Category name cannot be empty")]
    EmptyName,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct CategoryManager<'a> {
    storage: &'a dyn Storage,
}

impl<'a> CategoryManager<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    pub fn add_category(&self, name: &str) -> Result<Category, CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        let category = self.storage.insert_category(name)?;
        tracing::debug!(category_id = category.id, name, "created category");
        Ok(category)
    }

    /// Every category with its todos attached.
    pub fn list_categories(&self) -> Result<Vec<Category>, CategoryError> {
        Ok(self.storage.list_categories()?)
    }
}
