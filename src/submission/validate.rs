use serde_json::{Map, Value};

use crate::models::{NewSubmission, RatingField};

/// Normalize a raw survey payload.
///
/// `name` and `role` are always required. Ratings parse to an integer or
/// become `None`; a rating listed in `required_ratings` must parse. On
/// failure the missing fields are returned in form order.
pub fn validate(
    raw: &Value,
    required_ratings: &[RatingField],
) -> Result<NewSubmission, Vec<&'static str>> {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let mut missing = Vec::new();

    let name = text(obj, "name").filter(|s| !s.is_empty());
    if name.is_none() {
        missing.push("name");
    }

    let role = text(obj, "role").filter(|s| !s.is_empty());
    if role.is_none() {
        missing.push("role");
    }

    let mut submission = NewSubmission::default();
    for field in RatingField::ALL {
        let value = rating(obj, field.name());
        if value.is_none() && required_ratings.contains(&field) {
            missing.push(field.name());
        }
        submission.set_rating(field, value);
    }

    let (Some(name), Some(role)) = (name, role) else {
        return Err(missing);
    };
    if !missing.is_empty() {
        return Err(missing);
    }

    submission.name = name;
    submission.role = role;
    submission.reports = text(obj, "reports").filter(|s| !s.is_empty());
    submission.comments = text(obj, "comments");

    Ok(submission)
}

/// Trimmed text of a string or number value. Other JSON types count as absent.
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn rating(obj: &Map<String, Value>, key: &str) -> Option<i32> {
    match obj.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        _ => None,
    }
}
