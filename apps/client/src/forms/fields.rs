use std::collections::BTreeMap;
use std::fmt;

use crate::errors::ValidationError;

/// Which submission a form feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    JobOpening,
    JobSeeker,
}

/// Static description of a single form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire name, sent verbatim to the service.
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub multiline: bool,
}

const fn field(name: &'static str, label: &'static str, required: bool, multiline: bool) -> FieldSpec {
    FieldSpec {
        name,
        label,
        required,
        multiline,
    }
}

const JOB_OPENING_FIELDS: &[FieldSpec] = &[
    field("creator_email", "Creator Email", true, false),
    field("job_title", "Job Title", true, false),
    field("company_name", "Company Name", true, false),
    field("job_description", "Job Description", true, true),
    field("company_values", "Company Values", true, true),
    field("team_structure", "Team Structure", true, true),
    field("growth_opportunities", "Growth Opportunities", true, true),
];

const JOB_SEEKER_FIELDS: &[FieldSpec] = &[
    field("email", "Email", true, false),
    field("linkedin_url", "LinkedIn URL", false, false),
    field("github_url", "GitHub URL", false, false),
];

impl FormKind {
    /// The fixed, ordered field catalogue for this kind of form.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            FormKind::JobOpening => JOB_OPENING_FIELDS,
            FormKind::JobSeeker => JOB_SEEKER_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::JobOpening => write!(f, "job opening"),
            FormKind::JobSeeker => write!(f, "job seeker"),
        }
    }
}

/// User-entered text values for one submission.
///
/// Every catalogue field is present from construction, defaulting to the
/// empty string, so optional fields are always sent (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFormState {
    kind: FormKind,
    values: BTreeMap<&'static str, String>,
}

impl FieldFormState {
    pub fn new(kind: FormKind) -> Self {
        let values = kind
            .fields()
            .iter()
            .map(|f| (f.name, String::new()))
            .collect();
        Self { kind, values }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    /// Overwrites a field value. Names outside the form's catalogue are rejected.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), ValidationError> {
        let spec = self
            .kind
            .field(name)
            .ok_or_else(|| ValidationError::UnknownField {
                kind: self.kind,
                field: name.to_string(),
            })?;
        self.values.insert(spec.name, value.into());
        Ok(())
    }

    /// Builder-style `set`, handy when filling a form from known-good names.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Result<Self, ValidationError> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Required fields that are blank, in catalogue order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.kind
            .fields()
            .iter()
            .filter(|f| f.required)
            .filter(|f| self.get(f.name).map_or(true, |v| v.trim().is_empty()))
            .map(|f| f.name)
            .collect()
    }

    /// Fails on the first blank required field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.missing_required().first() {
            Some(&field) => Err(ValidationError::MissingField { field }),
            None => Ok(()),
        }
    }

    /// Values in catalogue order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.kind
            .fields()
            .iter()
            .map(move |f| (f.name, self.get(f.name).unwrap_or_default()))
    }

    pub fn reset(&mut self) {
        for value in self.values.values_mut() {
            value.clear();
        }
    }
}
