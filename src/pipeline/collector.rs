//! Input collection: the five-field selection and the option catalog front ends offer.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// The user's choice describing the training content they want prompts for.
///
/// Values are forwarded verbatim; membership in [`catalog`] is not enforced so
/// front ends may offer free-text entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub content_type: String,
    pub audience_type: String,
    pub delivery_method: String,
    pub content_theme: String,
    pub target_industry: String,
}

impl Selection {
    pub fn new(
        content_type: impl Into<String>,
        audience_type: impl Into<String>,
        delivery_method: impl Into<String>,
        content_theme: impl Into<String>,
        target_industry: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            audience_type: audience_type.into(),
            delivery_method: delivery_method.into(),
            content_theme: content_theme.into(),
            target_industry: target_industry.into(),
        }
    }

    /// (field, value) pairs in display order
    pub fn fields(&self) -> [(Field, &str); 5] {
        [
            (Field::ContentType, self.content_type.as_str()),
            (Field::AudienceType, self.audience_type.as_str()),
            (Field::DeliveryMethod, self.delivery_method.as_str()),
            (Field::ContentTheme, self.content_theme.as_str()),
            (Field::TargetIndustry, self.target_industry.as_str()),
        ]
    }

    /// Every field is required; a blank value is an input omission.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let missing: Vec<&str> = self
            .fields()
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field.key())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::invalid_input(format!(
                "missing value for {}",
                missing.join(", ")
            )))
        }
    }

    /// Fields whose value is not one of the catalog options
    pub fn unknown_fields(&self) -> Vec<Field> {
        self.fields()
            .iter()
            .filter(|(field, value)| !field.is_known(value))
            .map(|(field, _)| *field)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ContentType,
    AudienceType,
    DeliveryMethod,
    ContentTheme,
    TargetIndustry,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::ContentType,
        Field::AudienceType,
        Field::DeliveryMethod,
        Field::ContentTheme,
        Field::TargetIndustry,
    ];

    /// Wire name, as used in request bodies
    pub fn key(&self) -> &'static str {
        match self {
            Field::ContentType => "content_type",
            Field::AudienceType => "audience_type",
            Field::DeliveryMethod => "delivery_method",
            Field::ContentTheme => "content_theme",
            Field::TargetIndustry => "target_industry",
        }
    }

    /// Human-readable label used in instructions and UIs
    pub fn label(&self) -> &'static str {
        match self {
            Field::ContentType => "Content Type",
            Field::AudienceType => "Audience Type",
            Field::DeliveryMethod => "Delivery Method",
            Field::ContentTheme => "Content Theme",
            Field::TargetIndustry => "Target Industry",
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self {
            Field::ContentType => CONTENT_TYPES,
            Field::AudienceType => AUDIENCE_TYPES,
            Field::DeliveryMethod => DELIVERY_METHODS,
            Field::ContentTheme => CONTENT_THEMES,
            Field::TargetIndustry => TARGET_INDUSTRIES,
        }
    }

    pub fn is_known(&self, value: &str) -> bool {
        self.options().contains(&value)
    }
}

pub const CONTENT_TYPES: &[&str] = &[
    "Training Modules",
    "E-Learning Courses",
    "Case Studies/caselets",
    "Role Plays",
    "Interactive Quizzes",
    "Assessments",
    "Videos/Animations",
    "Infographics",
    "Worksheets/Job Aids",
    "Proposals",
    "Content Outline",
    "Feedback Templates",
    "Questionnaires",
    "Simulations",
    "Activities",
];

pub const AUDIENCE_TYPES: &[&str] = &[
    "Entry-Level Employees",
    "Mid-Level Professionals",
    "Senior Management",
    "Trainers/Facilitators",
    "Students",
    "Specialized Roles (e.g., Sales, Customer Support)",
    "Client Point of Contact/ LnD Head",
];

pub const DELIVERY_METHODS: &[&str] = &[
    "In-Person Training",
    "Virtual Instructor-Led Training (VILT)",
    "Self-Paced Learning",
    "Blended Learning",
    "Microlearning",
    "Outbound Training",
    "Experiential Learning",
];

pub const CONTENT_THEMES: &[&str] = &[
    "Leadership and Management",
    "Customer Service",
    "Communication Skills",
    "Technical Training",
    "Soft Skills",
    "Industry-Specific Skills",
    "Assessment Center",
];

pub const TARGET_INDUSTRIES: &[&str] = &[
    "Technology and IT",
    "Healthcare",
    "Finance and Banking",
    "Manufacturing",
    "Retail and E-commerce",
    "Hospitality",
    "Education and Academics",
];

/// One picker in the catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogField {
    pub key: &'static str,
    pub label: &'static str,
    pub options: &'static [&'static str],
}

/// The full option catalog, in form order
pub fn catalog() -> Vec<CatalogField> {
    Field::ALL
        .iter()
        .map(|field| CatalogField {
            key: field.key(),
            label: field.label(),
            options: field.options(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retail() -> Selection {
        Selection::new(
            "Training Modules",
            "Entry-Level Employees",
            "Self-Paced Learning",
            "Soft Skills",
            "Retail and E-commerce",
        )
    }

    #[test]
    fn test_valid_selection() {
        assert!(retail().validate().is_ok());
        assert!(retail().unknown_fields().is_empty());
    }

    #[test]
    fn test_blank_fields_reported() {
        let mut selection = retail();
        selection.audience_type = "  ".to_string();
        selection.target_industry = String::new();
        let err = selection.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("audience_type"));
        assert!(message.contains("target_industry"));
        assert!(!message.contains("content_type"));
    }

    #[test]
    fn test_free_text_values_are_accepted() {
        let mut selection = retail();
        selection.content_theme = "Negotiation".to_string();
        assert!(selection.validate().is_ok());
        assert_eq!(selection.unknown_fields(), vec![Field::ContentTheme]);
    }

    #[test]
    fn test_catalog_order_and_sizes() {
        let catalog = catalog();
        let keys: Vec<&str> = catalog.iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            vec![
                "content_type",
                "audience_type",
                "delivery_method",
                "content_theme",
                "target_industry"
            ]
        );
        assert_eq!(catalog[0].options.len(), 15);
        assert_eq!(catalog[4].options.len(), 7);
    }

    #[test]
    fn test_selection_deserializes_from_form_body() {
        let body = r#"{
            "content_type": "Role Plays",
            "audience_type": "Students",
            "delivery_method": "Microlearning",
            "content_theme": "Customer Service",
            "target_industry": "Healthcare"
        }"#;
        let selection: Selection = serde_json::from_str(body).unwrap();
        assert_eq!(selection.delivery_method, "Microlearning");
    }
}
