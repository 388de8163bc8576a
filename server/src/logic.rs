//! Request parsing and validation for the mask endpoints.
//!
//! Bodies are checked field by field so every problem is reported at once,
//! in the `{formErrors, fieldErrors}` shape the editor understands.

use serde_json::{Map, Value};
use wallmask_shared::{
    MaskId, MaskPatch, ModelId, NewMask, Point, ValidationErrors, DEFAULT_MASK_TYPE,
    DEFAULT_MODEL_ID, MIN_POLYGON_POINTS,
};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_TYPE_LEN: usize = 50;

pub fn parse_new_mask(body: &[u8]) -> Result<NewMask, ValidationErrors> {
    let object = parse_object(body)?;
    let mut errors = ValidationErrors::default();

    let model_id = model_id_field(object.get("modelId"), &mut errors);
    let name = trimmed_string_field(&object, "name", MAX_NAME_LEN, None, &mut errors);
    let kind = trimmed_string_field(
        &object,
        "type",
        MAX_TYPE_LEN,
        Some(DEFAULT_MASK_TYPE),
        &mut errors,
    );
    let opacity = opacity_field(&object, &mut errors);
    let points = points_field(&object, &mut errors);

    match (model_id, name, kind, opacity, points) {
        (Some(model_id), Some(name), Some(kind), Some(opacity), Some(points))
            if errors.is_empty() =>
        {
            Ok(NewMask {
                model_id,
                name,
                kind,
                opacity,
                points,
            })
        }
        _ => Err(errors),
    }
}

pub fn parse_mask_patch(body: &[u8]) -> Result<MaskPatch, ValidationErrors> {
    let object = parse_object(body)?;
    let mut errors = ValidationErrors::default();

    let name = trimmed_string_field(&object, "name", MAX_NAME_LEN, None, &mut errors);
    let opacity = opacity_field(&object, &mut errors);
    let points = points_field(&object, &mut errors);

    match (name, opacity, points) {
        (Some(name), Some(opacity), Some(points)) if errors.is_empty() => Ok(MaskPatch {
            name,
            opacity,
            points,
        }),
        _ => Err(errors),
    }
}

pub fn parse_mask_id(raw: &str) -> Option<MaskId> {
    raw.trim().parse::<MaskId>().ok()
}

/// Missing or empty selects the default model.
pub fn parse_model_query(raw: Option<&str>) -> Option<ModelId> {
    match raw.map(str::trim) {
        None | Some("") => Some(DEFAULT_MODEL_ID),
        Some(value) => value.parse::<ModelId>().ok(),
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => {
            errors.form("Expected a JSON object");
            Err(errors)
        }
        Err(error) => {
            errors.form(format!("Malformed JSON body: {error}"));
            Err(errors)
        }
    }
}

fn model_id_field(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<ModelId> {
    let number = match value {
        None | Some(Value::Null) => return Some(DEFAULT_MODEL_ID),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let Some(number) = number.filter(|n| n.is_finite()) else {
        errors.field("modelId", "Expected number");
        return None;
    };
    if number.fract() != 0.0 {
        errors.field("modelId", "Expected integer");
        return None;
    }
    if number <= 0.0 {
        errors.field("modelId", "Number must be greater than 0");
        return None;
    }
    Some(number as ModelId)
}

fn trimmed_string_field(
    object: &Map<String, Value>,
    field: &str,
    max_len: usize,
    default: Option<&str>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let text = match object.get(field) {
        None | Some(Value::Null) => match default {
            Some(default) => return Some(default.to_string()),
            None => {
                errors.field(field, "Required");
                return None;
            }
        },
        Some(Value::String(text)) => text.trim(),
        Some(_) => {
            errors.field(field, "Expected string");
            return None;
        }
    };
    let len = text.chars().count();
    if len == 0 {
        errors.field(field, "String must contain at least 1 character(s)");
        return None;
    }
    if len > max_len {
        errors.field(
            field,
            format!("String must contain at most {max_len} character(s)"),
        );
        return None;
    }
    Some(text.to_string())
}

fn opacity_field(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<f64> {
    let opacity = match object.get("opacity") {
        None | Some(Value::Null) => {
            errors.field("opacity", "Required");
            return None;
        }
        Some(value) => value.as_f64().filter(|n| n.is_finite()),
    };
    let Some(opacity) = opacity else {
        errors.field("opacity", "Expected number");
        return None;
    };
    if !(0.0..=1.0).contains(&opacity) {
        errors.field("opacity", "Number must be between 0 and 1");
        return None;
    }
    Some(opacity)
}

fn points_field(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<Vec<Point>> {
    let items = match object.get("points") {
        None | Some(Value::Null) => {
            errors.field("points", "Required");
            return None;
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.field("points", "Expected array");
            return None;
        }
    };
    let mut points = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match point_value(item) {
            Some(point) => points.push(point),
            None => errors.field(
                "points",
                format!("Item {index} must be an object with numeric x and y"),
            ),
        }
    }
    if items.len() < MIN_POLYGON_POINTS {
        errors.field(
            "points",
            format!("Array must contain at least {MIN_POLYGON_POINTS} element(s)"),
        );
        return None;
    }
    if points.len() != items.len() {
        return None;
    }
    Some(points)
}

fn point_value(value: &Value) -> Option<Point> {
    let object = value.as_object()?;
    let point = Point::new(object.get("x")?.as_f64()?, object.get("y")?.as_f64()?);
    point.is_finite().then_some(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"[{"x":10,"y":10},{"x":100,"y":10},{"x":100,"y":100}]"#;

    #[test]
    fn new_mask_defaults_model_and_type() {
        let body = format!(r#"{{"name":"  Okno lewe ","opacity":0.35,"points":{TRIANGLE}}}"#);
        let mask = parse_new_mask(body.as_bytes()).unwrap();
        assert_eq!(mask.model_id, DEFAULT_MODEL_ID);
        assert_eq!(mask.kind, "polygon");
        assert_eq!(mask.name, "Okno lewe");
        assert_eq!(mask.points.len(), 3);
    }

    #[test]
    fn model_id_accepts_numeric_strings() {
        let body =
            format!(r#"{{"modelId":"2","name":"a","opacity":1,"points":{TRIANGLE}}}"#);
        assert_eq!(parse_new_mask(body.as_bytes()).unwrap().model_id, 2);

        let body = format!(r#"{{"modelId":0,"name":"a","opacity":1,"points":{TRIANGLE}}}"#);
        let errors = parse_new_mask(body.as_bytes()).unwrap_err();
        assert!(errors.field_errors.contains_key("modelId"));

        let body = format!(r#"{{"modelId":1.5,"name":"a","opacity":1,"points":{TRIANGLE}}}"#);
        assert!(parse_new_mask(body.as_bytes()).is_err());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let body = r#"{"name":"   ","opacity":1.5,"points":[{"x":1,"y":2}]}"#;
        let errors = parse_new_mask(body.as_bytes()).unwrap_err();
        let fields = errors.field_errors.keys().cloned().collect::<Vec<_>>();
        assert_eq!(fields, ["name", "opacity", "points"]);
    }

    #[test]
    fn points_must_be_numeric_pairs() {
        let body = concat!(
            r#"{"name":"a","opacity":0.5,"#,
            r#""points":[{"x":1,"y":2},{"x":"3","y":4},{"x":5,"y":6}]}"#
        );
        let errors = parse_mask_patch(body.as_bytes()).unwrap_err();
        assert_eq!(errors.field_errors["points"].len(), 1);
    }

    #[test]
    fn name_length_is_bounded() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let body = format!(r#"{{"name":"{long}","opacity":0.5,"points":{TRIANGLE}}}"#);
        assert!(parse_mask_patch(body.as_bytes()).is_err());

        let exact = "x".repeat(MAX_NAME_LEN);
        let body = format!(r#"{{"name":"{exact}","opacity":0.5,"points":{TRIANGLE}}}"#);
        assert!(parse_mask_patch(body.as_bytes()).is_ok());
    }

    #[test]
    fn malformed_bodies_are_form_errors() {
        let errors = parse_mask_patch(b"{not json").unwrap_err();
        assert_eq!(errors.form_errors.len(), 1);
        let errors = parse_mask_patch(b"[1,2,3]").unwrap_err();
        assert_eq!(errors.form_errors, ["Expected a JSON object"]);
    }

    #[test]
    fn ids_and_model_queries() {
        assert_eq!(parse_mask_id("17"), Some(17));
        assert_eq!(parse_mask_id("abc"), None);
        assert_eq!(parse_model_query(None), Some(1));
        assert_eq!(parse_model_query(Some("")), Some(1));
        assert_eq!(parse_model_query(Some("4")), Some(4));
        assert_eq!(parse_model_query(Some("four")), None);
    }
}
