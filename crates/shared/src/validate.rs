//! Caller-side validation enforced before a payload is submitted.
//! The resource controller itself never validates; forms (or the CLI)
//! run these checks and keep invalid input from reaching the wire.

use thiserror::Error;

use crate::domain::{ProductDraft, ProductPatch};

pub const PRODUCT_NAME_MAX: usize = 100;
pub const PRODUCT_DESCRIPTION_MAX: usize = 500;
pub const PRODUCT_CATEGORY_MAX: usize = 50;
pub const PRODUCT_PRICE_MAX: f64 = 999_999.99;
pub const PRODUCT_STOCK_MAX: u32 = 99_999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("email is required")]
    EmailRequired,
    #[error("please enter a valid email address")]
    EmailInvalid,
    #[error("password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("product name must be between 2 and {PRODUCT_NAME_MAX} characters")]
    NameLength,
    #[error("price must be a positive number no greater than {PRODUCT_PRICE_MAX}")]
    PriceOutOfRange,
    #[error("description must be between 10 and {PRODUCT_DESCRIPTION_MAX} characters")]
    DescriptionLength,
    #[error("category must be between 1 and {PRODUCT_CATEGORY_MAX} characters")]
    CategoryLength,
    #[error("stock cannot exceed {PRODUCT_STOCK_MAX} units")]
    StockOutOfRange,
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !looks_like_email(email) {
        return Err(ValidationError::EmailInvalid);
    }
    if password.chars().count() < 6 {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_product_draft(draft: &ProductDraft) -> Result<(), ValidationError> {
    validate_name(&draft.name)?;
    validate_price(draft.price)?;
    validate_description(&draft.description)?;
    validate_category(&draft.category)?;
    validate_stock(draft.stock)?;
    Ok(())
}

/// Patches only validate the fields they carry.
pub fn validate_product_patch(patch: &ProductPatch) -> Result<(), ValidationError> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    if let Some(description) = &patch.description {
        validate_description(description)?;
    }
    if let Some(category) = &patch.category {
        validate_category(category)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if len < 2 || len > PRODUCT_NAME_MAX {
        return Err(ValidationError::NameLength);
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price <= 0.0 || price > PRODUCT_PRICE_MAX {
        return Err(ValidationError::PriceOutOfRange);
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    let len = description.chars().count();
    if len < 10 || len > PRODUCT_DESCRIPTION_MAX {
        return Err(ValidationError::DescriptionLength);
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), ValidationError> {
    let len = category.chars().count();
    if len == 0 || len > PRODUCT_CATEGORY_MAX {
        return Err(ValidationError::CategoryLength);
    }
    Ok(())
}

fn validate_stock(stock: u32) -> Result<(), ValidationError> {
    if stock > PRODUCT_STOCK_MAX {
        return Err(ValidationError::StockOutOfRange);
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !email.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Smart Watch".into(),
            price: 399.99,
            description: "Advanced smartwatch with health monitoring features".into(),
            category: "Electronics".into(),
            stock: 30,
        }
    }

    #[test]
    fn accepts_a_well_formed_draft() {
        assert_eq!(validate_product_draft(&draft()), Ok(()));
    }

    #[test]
    fn rejects_non_positive_or_oversized_prices() {
        let mut d = draft();
        d.price = 0.0;
        assert_eq!(
            validate_product_draft(&d),
            Err(ValidationError::PriceOutOfRange)
        );
        d.price = 1_000_000.0;
        assert_eq!(
            validate_product_draft(&d),
            Err(ValidationError::PriceOutOfRange)
        );
    }

    #[test]
    fn rejects_out_of_bounds_text_fields() {
        let mut d = draft();
        d.name = "X".into();
        assert_eq!(validate_product_draft(&d), Err(ValidationError::NameLength));

        let mut d = draft();
        d.description = "too short".into();
        assert_eq!(
            validate_product_draft(&d),
            Err(ValidationError::DescriptionLength)
        );

        let mut d = draft();
        d.category = String::new();
        assert_eq!(
            validate_product_draft(&d),
            Err(ValidationError::CategoryLength)
        );
    }

    #[test]
    fn rejects_excess_stock() {
        let mut d = draft();
        d.stock = 100_000;
        assert_eq!(
            validate_product_draft(&d),
            Err(ValidationError::StockOutOfRange)
        );
    }

    #[test]
    fn patch_only_checks_present_fields() {
        let patch = ProductPatch {
            price: Some(12.5),
            ..ProductPatch::default()
        };
        assert_eq!(validate_product_patch(&patch), Ok(()));

        let patch = ProductPatch {
            stock: Some(1_000_000),
            ..ProductPatch::default()
        };
        assert_eq!(
            validate_product_patch(&patch),
            Err(ValidationError::StockOutOfRange)
        );
    }

    #[test]
    fn validates_login_credentials() {
        assert_eq!(validate_login("admin@example.com", "password123"), Ok(()));
        assert_eq!(
            validate_login("", "password123"),
            Err(ValidationError::EmailRequired)
        );
        assert_eq!(
            validate_login("not-an-email", "password123"),
            Err(ValidationError::EmailInvalid)
        );
        assert_eq!(
            validate_login("admin@example.com", "short"),
            Err(ValidationError::PasswordTooShort)
        );
    }
}
