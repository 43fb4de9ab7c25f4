//! Multipart form bodies shared by the create and update handlers.

use axum::extract::Multipart;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;

/// An image attached to a create/update request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Text fields in arrival order plus at most one image.
#[derive(Debug, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
    pub image: Option<ImageUpload>,
}

impl FormData {
    /// Drain a multipart body. The field named `image_field` is read as the
    /// image; every other field is read as text. Empty file parts are ignored.
    pub async fn from_multipart(
        mut multipart: Multipart,
        image_field: &str,
    ) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(format!("invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == image_field {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read {name}: {e}")))?;
                if data.is_empty() {
                    continue;
                }
                if !content_type.starts_with("image/") {
                    return Err(ApiError::Validation(format!(
                        "{name} must be an image, got {content_type}"
                    )));
                }
                form.image = Some(ImageUpload {
                    data: data.to_vec(),
                    content_type,
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read {name}: {e}")))?;
                form.fields.push((name, text));
            }
        }

        Ok(form)
    }

    /// Build a form from text pairs, bypassing multipart decoding.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        FormData {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            image: None,
        }
    }

    /// First value of `name`, trimmed. Blank values count as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Like [`FormData::text`] but a missing value is a validation error.
    pub fn required(&self, name: &str) -> Result<String, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::Validation(format!("{name} is required")))
    }

    pub fn parse<T>(&self, name: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.text(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| ApiError::Validation(format!("invalid {name} '{raw}': {e}")))
            })
            .transpose()
    }

    /// Every UUID given for `name`, in order. Accepts repeated fields and
    /// comma-separated values.
    pub fn uuid_list(&self, name: &str) -> Result<Vec<Uuid>, ApiError> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| {
                Uuid::parse_str(v)
                    .map_err(|e| ApiError::Validation(format!("invalid {name} '{v}': {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_skips_blank_values() {
        let form = FormData::from_pairs([("title", "  "), ("title", " Song ")]);
        assert_eq!(form.text("title").as_deref(), Some("Song"));
        assert!(form.text("genre").is_none());
    }

    #[test]
    fn test_required_reports_field_name() {
        let form = FormData::from_pairs([("title", "")]);
        let err = form.required("title").unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "title is required"));
    }

    #[test]
    fn test_parse_numbers_and_dates() {
        let form = FormData::from_pairs([("duration", "215"), ("release_date", "2024-03-01")]);
        assert_eq!(form.parse::<i32>("duration").unwrap(), Some(215));
        assert_eq!(
            form.parse::<chrono::NaiveDate>("release_date").unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(form.parse::<i32>("missing").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let form = FormData::from_pairs([("duration", "three minutes")]);
        assert!(matches!(
            form.parse::<i32>("duration"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_uuid_list_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let form = FormData::from_pairs([
            ("artist_ids", format!("{a}, {b}")),
            ("artist_ids", c.to_string()),
        ]);
        assert_eq!(form.uuid_list("artist_ids").unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_uuid_list_rejects_bad_id() {
        let form = FormData::from_pairs([("artist_ids", "not-a-uuid")]);
        assert!(form.uuid_list("artist_ids").is_err());
    }
}
