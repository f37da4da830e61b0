use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::FieldError, models::Product};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub product_code: String,
    pub category: String,
    pub price: i64,
    pub size: Option<String>,
    pub weight: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if self.product_code.trim().is_empty() {
            errors.push(FieldError::new("productCode", "Product code is required"));
        }
        if self.category.trim().is_empty() {
            errors.push(FieldError::new("category", "Category is required"));
        }
        if self.price < 0 {
            errors.push(FieldError::new("price", "Valid price is required"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub size: Option<String>,
    pub weight: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub products: Vec<Product>,
}
