//! # Validation
//!
//! Length and shape rules applied to a normalized [`PhotoDraft`]. Lengths
//! count Unicode scalar values of the already-trimmed strings.

use chrono::NaiveDate;
use domains::ValidationErrors;

use crate::metadata::{Field, PhotoDraft};

pub const TITLE_MAX: usize = 120;
pub const SUBTITLE_MAX: usize = 160;
pub const DESCRIPTION_MAX: usize = 10_000;
pub const ALT_MAX: usize = 160;
pub const LOCATION_MAX: usize = 120;
pub const TAGS_MAX: usize = 10;
pub const TAG_MAX: usize = 30;

/// Everything needed to insert a photo, minus the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub title: String,
    pub subtitle: Option<String>,
    pub description_md: String,
    /// `None` means "use the title".
    pub alt: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub taken_date: Option<NaiveDate>,
    pub featured: bool,
    pub is_visible: bool,
    pub order: Option<i32>,
}

/// Validated partial update. Only `Some` / non-absent fields were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhotoEdit {
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub description_md: Option<String>,
    /// `Clear` resets alt to the (possibly new) title.
    pub alt: Field<String>,
    pub location: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub taken_date: Option<Option<NaiveDate>>,
    pub featured: Option<bool>,
    pub is_visible: Option<bool>,
    pub order: Option<i32>,
}

pub fn validate_new(draft: PhotoDraft) -> Result<NewPhoto, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = required(&mut errors, "title", draft.title, TITLE_MAX);
    let description_md = required(
        &mut errors,
        "descriptionMd",
        draft.description_md,
        DESCRIPTION_MAX,
    );
    let subtitle = optional(&mut errors, "subtitle", draft.subtitle, SUBTITLE_MAX).flatten();
    let alt = optional(&mut errors, "alt", draft.alt, ALT_MAX).flatten();
    let location = optional(&mut errors, "location", draft.location, LOCATION_MAX).flatten();
    let tags = tag_list(&mut errors, draft.tags).unwrap_or_default();

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(NewPhoto {
        title: title.unwrap_or_default(),
        subtitle,
        description_md: description_md.unwrap_or_default(),
        alt,
        location,
        tags,
        taken_date: draft.taken_date.as_set().copied(),
        featured: draft.featured.as_set().copied().unwrap_or(false),
        is_visible: draft.is_visible.as_set().copied().unwrap_or(false),
        order: draft.order.as_set().copied(),
    })
}

pub fn validate_edit(draft: PhotoDraft) -> Result<PhotoEdit, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = match draft.title {
        Field::Absent => None,
        present => required(&mut errors, "title", present, TITLE_MAX),
    };
    let description_md = match draft.description_md {
        Field::Absent => None,
        present => required(&mut errors, "descriptionMd", present, DESCRIPTION_MAX),
    };
    let subtitle = optional(&mut errors, "subtitle", draft.subtitle, SUBTITLE_MAX);
    let location = optional(&mut errors, "location", draft.location, LOCATION_MAX);
    let alt = match optional(&mut errors, "alt", draft.alt, ALT_MAX) {
        None => Field::Absent,
        Some(None) => Field::Clear,
        Some(Some(alt)) => Field::Set(alt),
    };
    let tags = tag_list(&mut errors, draft.tags);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(PhotoEdit {
        title,
        subtitle,
        description_md,
        alt,
        location,
        tags,
        taken_date: match draft.taken_date {
            Field::Absent => None,
            Field::Clear => Some(None),
            Field::Set(date) => Some(Some(date)),
        },
        featured: draft.featured.as_set().copied(),
        is_visible: draft.is_visible.as_set().copied(),
        order: draft.order.as_set().copied(),
    })
}

fn required(
    errors: &mut ValidationErrors,
    field: &str,
    value: Field<String>,
    max: usize,
) -> Option<String> {
    match value {
        Field::Set(v) if v.chars().count() <= max => Some(v),
        _ => {
            errors.push(field, format!("{field} must be 1-{max} characters"));
            None
        }
    }
}

/// `None` absent, `Some(None)` cleared, `Some(Some(v))` set.
fn optional(
    errors: &mut ValidationErrors,
    field: &str,
    value: Field<String>,
    max: usize,
) -> Option<Option<String>> {
    match value {
        Field::Absent => None,
        Field::Clear => Some(None),
        Field::Set(v) if v.chars().count() <= max => Some(Some(v)),
        Field::Set(_) => {
            errors.push(field, format!("{field} must be at most {max} characters"));
            None
        }
    }
}

fn tag_list(errors: &mut ValidationErrors, tags: Field<Vec<String>>) -> Option<Vec<String>> {
    let tags = match tags {
        Field::Absent => return None,
        Field::Clear => Vec::new(),
        Field::Set(tags) => tags,
    };
    if tags.len() > TAGS_MAX {
        errors.push("tags", format!("at most {TAGS_MAX} tags"));
        return None;
    }
    if tags.iter().any(|t| t.chars().count() > TAG_MAX) {
        errors.push("tags", format!("each tag must be at most {TAG_MAX} characters"));
        return None;
    }
    Some(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, description: &str) -> PhotoDraft {
        PhotoDraft {
            title: Field::Set(title.to_string()),
            description_md: Field::Set(description.to_string()),
            ..PhotoDraft::default()
        }
    }

    #[test]
    fn minimal_create_gets_defaults() {
        let photo = validate_new(draft("Sunset", "desc")).unwrap();
        assert_eq!(photo.title, "Sunset");
        assert!(!photo.featured);
        assert!(!photo.is_visible);
        assert_eq!(photo.alt, None);
        assert!(photo.tags.is_empty());
    }

    #[test]
    fn create_requires_title_and_description() {
        let errors = validate_new(PhotoDraft::default()).unwrap_err();
        assert!(errors.contains("title"));
        assert!(errors.contains("descriptionMd"));
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let title: String = "é".repeat(TITLE_MAX);
        assert!(validate_new(draft(&title, "d")).is_ok());
        let title: String = "é".repeat(TITLE_MAX + 1);
        assert!(validate_new(draft(&title, "d")).unwrap_err().contains("title"));
    }

    #[test]
    fn tag_limits() {
        let mut d = draft("t", "d");
        d.tags = Field::Set((0..11).map(|i| format!("t{i}")).collect());
        assert!(validate_new(d).unwrap_err().contains("tags"));

        let mut d = draft("t", "d");
        d.tags = Field::Set(vec!["x".repeat(TAG_MAX + 1)]);
        assert!(validate_new(d).unwrap_err().contains("tags"));
    }

    #[test]
    fn edit_only_checks_supplied_fields() {
        let edit = validate_edit(PhotoDraft {
            subtitle: Field::Clear,
            ..PhotoDraft::default()
        })
        .unwrap();
        assert_eq!(edit.subtitle, Some(None));
        assert_eq!(edit.title, None);
        assert!(edit.alt.is_absent());
    }

    #[test]
    fn edit_cannot_blank_the_title() {
        let errors = validate_edit(PhotoDraft {
            title: Field::Clear,
            ..PhotoDraft::default()
        })
        .unwrap_err();
        assert!(errors.contains("title"));
    }

    #[test]
    fn edit_clears_taken_date_and_alt() {
        let edit = validate_edit(PhotoDraft {
            taken_date: Field::Clear,
            alt: Field::Clear,
            ..PhotoDraft::default()
        })
        .unwrap();
        assert_eq!(edit.taken_date, Some(None));
        assert_eq!(edit.alt, Field::Clear);
    }
}
