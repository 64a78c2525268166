use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

/// Fields accepted by product writes
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub price: f64,
}

impl ProductInput {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }

    /// Empty names and any finite price are accepted.
    pub fn validate(&self) -> Result<()> {
        if !self.price.is_finite() {
            return Err(StoreError::Validation(format!(
                "price must be a finite number, got {}",
                self.price
            )));
        }
        Ok(())
    }

    pub(crate) fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
        }
    }
}
