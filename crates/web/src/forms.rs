//! Form decoding and validation.
//!
//! Every request payload is first decoded into a raw struct of strings, then
//! a single `validate()` call turns it into an immutable typed value or a
//! [`FieldErrors`] map. Nothing reaches a store without passing through here.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use stockroom_core::{ItemName, PhoneNumber, Price, Username};

use crate::models::Item;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length (bounds hashing cost).
pub const MAX_PASSWORD_LENGTH: usize = 128;
/// Maximum display name length.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

const REQUIRED: &str = "This field is required.";

// =============================================================================
// Field Errors
// =============================================================================

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages for one field (empty if none).
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names with at least one message.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Require a non-blank value; returns the trimmed value.
fn required<'a>(errors: &mut FieldErrors, field: &str, value: &'a str) -> Option<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    Some(trimmed)
}

/// Require at most `max` characters.
fn max_chars(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> bool {
    if value.chars().count() > max {
        errors.add(field, format!("Must be at most {max} characters."));
        return false;
    }
    true
}

/// Run a core type parser, recording its error message on failure.
fn parsed<T, E: std::fmt::Display>(
    errors: &mut FieldErrors,
    field: &str,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.add(field, capitalize(&e.to_string()));
            None
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        let mut out: String = first.to_uppercase().collect();
        out.push_str(chars.as_str());
        out.push('.');
        out
    })
}

/// Validate the three item fields; `prefix` namespaces the error keys.
fn validate_item_fields(
    errors: &mut FieldErrors,
    prefix: &str,
    item_name: &str,
    description: &str,
    price: &str,
) -> Option<Item> {
    let name_field = format!("{prefix}item_name");
    let description_field = format!("{prefix}description");
    let price_field = format!("{prefix}price");

    let name = required(errors, &name_field, item_name)
        .and_then(|value| parsed(errors, &name_field, ItemName::parse(value)));

    let description = description.trim();
    let description_ok = max_chars(
        errors,
        &description_field,
        description,
        Item::MAX_DESCRIPTION_LENGTH,
    );

    let price = required(errors, &price_field, price)
        .and_then(|value| parsed(errors, &price_field, Price::parse(value)));

    match (name, price) {
        (Some(name), Some(price)) if description_ok => Some(Item::new(name, description, price)),
        _ => None,
    }
}

// =============================================================================
// Item Forms
// =============================================================================

/// Add-item form (`POST /`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub item_name: String,
    pub description: String,
    pub price: String,
}

impl ItemForm {
    /// Decode into an [`Item`].
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field is invalid.
    pub fn validate(&self) -> Result<Item, FieldErrors> {
        let mut errors = FieldErrors::default();
        let item = validate_item_fields(
            &mut errors,
            "",
            &self.item_name,
            &self.description,
            &self.price,
        );
        match item {
            Some(item) if errors.is_empty() => Ok(item),
            _ => Err(errors),
        }
    }
}

/// A number sent by a script, either as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// One side of an update request.
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    pub item_name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<RawNumber>,
}

/// JSON body of `POST /items/update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdateRequest {
    pub old_item: RawItem,
    pub new_item: RawItem,
}

/// A validated update: which item to rewrite, and its new fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub old_name: ItemName,
    pub item: Item,
}

impl ItemUpdateRequest {
    /// Decode into an [`ItemUpdate`].
    ///
    /// Only the old item's name is used to locate the row; its other fields
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns messages keyed `oldItem.item_name`, `newItem.item_name`,
    /// `newItem.description` and `newItem.price`.
    pub fn validate(&self) -> Result<ItemUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();

        let old_name = required(&mut errors, "oldItem.item_name", &self.old_item.item_name)
            .and_then(|value| parsed(&mut errors, "oldItem.item_name", ItemName::parse(value)));

        let price = self
            .new_item
            .price
            .as_ref()
            .map(RawNumber::as_text)
            .unwrap_or_default();
        let item = validate_item_fields(
            &mut errors,
            "newItem.",
            &self.new_item.item_name,
            &self.new_item.description,
            &price,
        );

        match (old_name, item) {
            (Some(old_name), Some(item)) if errors.is_empty() => Ok(ItemUpdate { old_name, item }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Auth Forms
// =============================================================================

/// Login form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Checkbox; present (any value) when ticked.
    pub remember_me: Option<String>,
}

/// Validated login attempt.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub remember_me: bool,
}

impl LoginForm {
    /// Check that both fields are present.
    ///
    /// The username format is not checked here: a malformed username must
    /// produce the same "invalid username or password" outcome as an unknown one.
    ///
    /// # Errors
    ///
    /// Returns messages for missing fields.
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::default();
        let username = required(&mut errors, "username", &self.username).map(str::to_owned);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }

        match username {
            Some(username) if errors.is_empty() => Ok(Credentials {
                username,
                password: SecretString::from(self.password.clone()),
                remember_me: self.remember_me.is_some(),
            }),
            _ => Err(errors),
        }
    }
}

/// Registration form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub name: String,
    pub password: String,
    pub password_confirm: String,
    pub phonenumber: String,
}

/// Validated registration.
#[derive(Debug)]
pub struct Registration {
    pub username: Username,
    pub display_name: String,
    pub password: SecretString,
    pub phone: PhoneNumber,
}

impl RegisterForm {
    /// Decode into a [`Registration`].
    ///
    /// Username uniqueness is left to the user store.
    ///
    /// # Errors
    ///
    /// Returns per-field messages when any field is invalid or the passwords differ.
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::default();

        let username = required(&mut errors, "username", &self.username)
            .and_then(|value| parsed(&mut errors, "username", Username::parse(value)));

        let display_name = required(&mut errors, "name", &self.name)
            .filter(|value| max_chars(&mut errors, "name", value, MAX_DISPLAY_NAME_LENGTH))
            .map(str::to_owned);

        let password_len = self.password.chars().count();
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        } else if password_len < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Must be at least {MIN_PASSWORD_LENGTH} characters."),
            );
        } else if password_len > MAX_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Must be at most {MAX_PASSWORD_LENGTH} characters."),
            );
        }
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords must match.");
        }

        let phone = required(&mut errors, "phonenumber", &self.phonenumber)
            .and_then(|value| parsed(&mut errors, "phonenumber", PhoneNumber::parse(value)));

        match (username, display_name, phone) {
            (Some(username), Some(display_name), Some(phone)) if errors.is_empty() => {
                Ok(Registration {
                    username,
                    display_name,
                    password: SecretString::from(self.password.clone()),
                    phone,
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn item_form(name: &str, description: &str, price: &str) -> ItemForm {
        ItemForm {
            item_name: name.to_string(),
            description: description.to_string(),
            price: price.to_string(),
        }
    }

    fn register_form() -> RegisterForm {
        RegisterForm {
            username: "alice".to_string(),
            name: "Alice Tan".to_string(),
            password: "correct horse".to_string(),
            password_confirm: "correct horse".to_string(),
            phonenumber: "+65 9123 4567".to_string(),
        }
    }

    #[test]
    fn test_item_form_valid() {
        let item = item_form(" Hammer ", " Claw hammer ", "12.50").validate().unwrap();
        assert_eq!(item.item_name.as_str(), "Hammer");
        assert_eq!(item.description, "Claw hammer");
        assert_eq!(item.price, Price::parse("12.5").unwrap());
    }

    #[test]
    fn test_item_form_reports_every_bad_field() {
        let errors = item_form("", &"d".repeat(501), "-3").validate().unwrap_err();
        assert_eq!(errors.get("item_name"), [REQUIRED.to_string()]);
        assert_eq!(errors.get("description").len(), 1);
        assert_eq!(errors.get("price"), ["Price cannot be negative.".to_string()]);
    }

    #[test]
    fn test_item_form_requires_price() {
        let errors = item_form("Saw", "", " ").validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["price"]);
    }

    #[test]
    fn test_item_form_non_numeric_price() {
        let errors = item_form("Saw", "", "cheap").validate().unwrap_err();
        assert_eq!(errors.get("price"), ["Price must be a number.".to_string()]);
    }

    #[test]
    fn test_update_request_accepts_number_or_string_price() {
        let json = r#"{
            "oldItem": {"item_name": "x", "description": "d", "price": 1.0},
            "newItem": {"item_name": "y", "description": "e", "price": "2.25"}
        }"#;
        let request: ItemUpdateRequest = serde_json::from_str(json).unwrap();
        let update = request.validate().unwrap();
        assert_eq!(update.old_name.as_str(), "x");
        assert_eq!(update.item.item_name.as_str(), "y");
        assert_eq!(update.item.price, Price::parse("2.25").unwrap());

        let json = r#"{
            "oldItem": {"item_name": "x"},
            "newItem": {"item_name": "y", "price": 3}
        }"#;
        let request: ItemUpdateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.validate().unwrap().item.price, Price::parse("3").unwrap());
    }

    #[test]
    fn test_update_request_prefixes_errors() {
        let json = r#"{
            "oldItem": {"item_name": ""},
            "newItem": {"item_name": "y"}
        }"#;
        let request: ItemUpdateRequest = serde_json::from_str(json).unwrap();
        let errors = request.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["newItem.price", "oldItem.item_name"]
        );
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            username: " alice ".to_string(),
            password: "pw".to_string(),
            remember_me: Some("on".to_string()),
        };
        let credentials = form.validate().unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "pw");
        assert!(credentials.remember_me);

        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["password", "username"]
        );
    }

    #[test]
    fn test_register_form_valid() {
        let registration = register_form().validate().unwrap();
        assert_eq!(registration.username.as_str(), "alice");
        assert_eq!(registration.display_name, "Alice Tan");
        assert_eq!(registration.phone.as_str(), "+6591234567");
    }

    #[test]
    fn test_register_form_password_rules() {
        let mut form = register_form();
        form.password = "short".to_string();
        form.password_confirm = "different".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password").len(), 1);
        assert_eq!(errors.get("password_confirm"), ["Passwords must match.".to_string()]);
    }

    #[test]
    fn test_register_form_field_formats() {
        let mut form = register_form();
        form.username = "no spaces".to_string();
        form.phonenumber = "call me".to_string();
        form.name = "   ".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["name", "phonenumber", "username"]
        );
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let mut errors = FieldErrors::default();
        errors.add("price", "Price is required.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"price": ["Price is required."]}));
    }
}
