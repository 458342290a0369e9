//! Structural checks on incoming user payloads.
//!
//! Every rule runs and every violation is reported, in field declaration
//! order (`name`, `email`, `age`, `active`), so a client can fix all of them
//! in one round trip.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::repo_types::{NewUser, UserChanges};
use crate::error::FieldError;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const AGE_MIN: i64 = 0;
pub const AGE_MAX: i64 = 120;
const EMAIL_MAX_LEN: usize = 255;

/// Request body as sent by the client, before any type or range checks.
#[derive(Debug, Default, Deserialize)]
pub struct RawUserPayload {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub active: Option<Value>,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        // dot-separated domain labels, alphabetic TLD of two or more letters
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[^@\s.][^@\s]*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$"
        )
        .unwrap();
    }
    email.len() <= EMAIL_MAX_LEN && EMAIL_RE.is_match(email)
}

/// Canonical form used for storage and uniqueness: lowercased, and for
/// Gmail addresses without dots or `+tag` in the local part.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim().to_lowercase();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return email;
    };
    match domain {
        "gmail.com" | "googlemail.com" => {
            let local = local.split('+').next().unwrap_or(local).replace('.', "");
            format!("{local}@gmail.com")
        }
        _ => email,
    }
}

pub fn validate_id(raw: &str) -> Result<Uuid, Vec<FieldError>> {
    Uuid::parse_str(raw.trim()).map_err(|_| vec![FieldError::new("id", "invalid id")])
}

pub fn validate_create(payload: RawUserPayload) -> Result<NewUser, Vec<FieldError>> {
    let mut errors = Vec::new();

    let name = check_name(payload.name.as_ref());
    let name = collect(&mut errors, "name", "name is required", name);
    let email = check_email(payload.email.as_ref());
    let email = collect(&mut errors, "email", "email is required", email);
    let age = check_age(payload.age.as_ref());
    let age = collect(&mut errors, "age", "age is required", age);
    // accepted for shape only; new records always start active
    if let Err(e) = check_active(payload.active.as_ref()) {
        errors.push(e);
    }

    match (name, email, age) {
        (Some(name), Some(email), Some(age)) if errors.is_empty() => {
            Ok(NewUser { name, email, age })
        }
        _ => Err(errors),
    }
}

pub fn validate_update(payload: RawUserPayload) -> Result<UserChanges, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut changes = UserChanges::default();

    match check_name(payload.name.as_ref()) {
        Ok(v) => changes.name = v,
        Err(e) => errors.push(e),
    }
    match check_email(payload.email.as_ref()) {
        Ok(v) => changes.email = v,
        Err(e) => errors.push(e),
    }
    match check_age(payload.age.as_ref()) {
        Ok(v) => changes.age = v,
        Err(e) => errors.push(e),
    }
    match check_active(payload.active.as_ref()) {
        Ok(v) => changes.active = v,
        Err(e) => errors.push(e),
    }

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(errors)
    }
}

/// Records a failed rule, or a missing-field error when the value was absent.
fn collect<T>(
    errors: &mut Vec<FieldError>,
    field: &str,
    required_msg: &str,
    checked: Result<Option<T>, FieldError>,
) -> Option<T> {
    match checked {
        Ok(Some(v)) => Some(v),
        Ok(None) => {
            errors.push(FieldError::new(field, required_msg));
            None
        }
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

fn check_name(value: Option<&Value>) -> Result<Option<String>, FieldError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let Value::String(raw) = value else {
        return Err(FieldError::new("name", "name must be a string"));
    };
    let name = raw.trim();
    if name.is_empty() {
        return Err(FieldError::new("name", "name is required"));
    }
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(FieldError::new(
            "name",
            "name must be between 2 and 100 characters",
        ));
    }
    Ok(Some(name.to_string()))
}

fn check_email(value: Option<&Value>) -> Result<Option<String>, FieldError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let Value::String(raw) = value else {
        return Err(FieldError::new("email", "email is invalid"));
    };
    let email = raw.trim();
    if email.is_empty() {
        return Err(FieldError::new("email", "email is required"));
    }
    if !is_valid_email(email) {
        return Err(FieldError::new("email", "email is invalid"));
    }
    Ok(Some(normalize_email(email)))
}

fn check_age(value: Option<&Value>) -> Result<Option<i32>, FieldError> {
    let out_of_range = || FieldError::new("age", "age must be an integer between 0 and 120");
    let age = match value {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(out_of_range)?,
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(FieldError::new("age", "age is required"));
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| out_of_range())?,
        Some(_) => return Err(out_of_range()),
    };
    if !(AGE_MIN..=AGE_MAX).contains(&age) {
        return Err(out_of_range());
    }
    i32::try_from(age).map(Some).map_err(|_| out_of_range())
}

fn check_active(value: Option<&Value>) -> Result<Option<bool>, FieldError> {
    match value {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s == "true" => Ok(Some(true)),
        Some(Value::String(s)) if s == "false" => Ok(Some(false)),
        Some(_) => Err(FieldError::new("active", "active must be a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> RawUserPayload {
        serde_json::from_value(v).unwrap()
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn create_accepts_and_sanitizes() {
        let user = validate_create(payload(json!({
            "name": "  Ana Silva ",
            "email": " Ana@Example.COM",
            "age": 30
        })))
        .unwrap();
        assert_eq!(user.name, "Ana Silva");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.age, 30);
    }

    #[test]
    fn create_reports_every_missing_field_in_order() {
        let errors = validate_create(payload(json!({}))).unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "email", "age"]);
        assert_eq!(errors[0].message, "name is required");
        assert_eq!(errors[2].message, "age is required");
    }

    #[test]
    fn create_collects_all_rule_failures() {
        let errors = validate_create(payload(json!({
            "name": "A",
            "email": "not-an-email",
            "age": 121,
            "active": "yes"
        })))
        .unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "email", "age", "active"]);
        assert_eq!(errors[0].message, "name must be between 2 and 100 characters");
        assert_eq!(errors[1].message, "email is invalid");
        assert_eq!(errors[3].message, "active must be a boolean");
    }

    #[test]
    fn age_bounds_are_inclusive() {
        for age in [0, 120] {
            assert!(validate_create(payload(json!({
                "name": "Bo", "email": "bo@example.com", "age": age
            })))
            .is_ok());
        }
        for age in [json!(-1), json!(12.5), json!("abc"), json!(true)] {
            let errors = validate_create(payload(json!({
                "name": "Bo", "email": "bo@example.com", "age": age
            })))
            .unwrap_err();
            assert_eq!(fields(&errors), vec!["age"]);
        }
    }

    #[test]
    fn numeric_strings_are_accepted_for_age() {
        let user = validate_create(payload(json!({
            "name": "Bo", "email": "bo@example.com", "age": " 42 "
        })))
        .unwrap();
        assert_eq!(user.age, 42);
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        let name: String = "é".repeat(100);
        assert!(validate_create(payload(json!({
            "name": name, "email": "e@example.com", "age": 1
        })))
        .is_ok());
        let too_long: String = "é".repeat(101);
        assert!(validate_create(payload(json!({
            "name": too_long, "email": "e@example.com", "age": 1
        })))
        .is_err());
    }

    #[test]
    fn update_only_sets_supplied_fields() {
        let changes = validate_update(payload(json!({ "age": 31 }))).unwrap();
        assert_eq!(
            changes,
            UserChanges {
                age: Some(31),
                ..Default::default()
            }
        );
        assert!(validate_update(payload(json!({}))).unwrap().is_empty());
    }

    #[test]
    fn update_checks_supplied_fields() {
        let errors = validate_update(payload(json!({ "name": "", "active": 1 }))).unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "active"]);
    }

    #[test]
    fn null_is_treated_as_absent() {
        let changes = validate_update(payload(json!({ "email": null, "active": "false" }))).unwrap();
        assert_eq!(changes.email, None);
        assert_eq!(changes.active, Some(false));
    }

    #[test]
    fn email_domains_must_be_well_formed() {
        for good in ["ana@example.com", "a.b+c@mail.example.co.uk", "x@my-host.io"] {
            assert!(is_valid_email(good), "{good}");
        }
        for bad in [
            "a@..com",
            "a@b.c",
            "a@.example.com",
            "a@example..com",
            "a@-host.com",
            "a@example.com.",
            ".a@example.com",
            "a@localhost",
            "a b@example.com",
        ] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn gmail_addresses_are_canonicalized() {
        assert_eq!(normalize_email("John.Doe+news@GoogleMail.com"), "johndoe@gmail.com");
        assert_eq!(normalize_email("first.last+x@example.org"), "first.last+x@example.org");
    }

    #[test]
    fn id_must_be_a_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(validate_id(&id.to_string()).unwrap(), id);
        let errors = validate_id("123").unwrap_err();
        assert_eq!(errors, vec![FieldError::new("id", "invalid id")]);
    }
}
