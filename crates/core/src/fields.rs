//! Statically declared field mappings for record edits.
//!
//! An implicit runtime dictionary from display field names to storage
//! columns silently falls through for anything it does not know. Here the
//! mapping is a closed enum per entity instead:
//! the display-name parse happens once at the boundary, the column name
//! comes from an exhaustive `match` the compiler checks, and columns that
//! must never be edited are not representable at all.

use std::collections::BTreeMap;

use serde_json::Value;

/// Columns that are never editable through the generic edit path, for any
/// entity.
pub const NON_EDITABLE_COLUMNS: &[&str] = &[
    "id",
    "profile_id",
    "patient_id",
    "specialist_id",
    "created_at",
    "updated_at",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("field '{0}' is not editable")]
    NotEditable(String),
    #[error("unknown field '{0}'")]
    Unknown(String),
    #[error("no editable fields in payload")]
    Empty,
}

/// An editable field with a statically known storage column.
pub trait ColumnMapped: Copy {
    /// Parses a display field name; non-editable names are distinguished
    /// from unknown ones so the caller can report them accurately.
    fn from_display(name: &str) -> Result<Self, FieldError>
    where
        Self: Sized;

    /// The storage column this field writes.
    fn column(self) -> &'static str;
}

fn reject_non_editable(name: &str) -> Result<(), FieldError> {
    if NON_EDITABLE_COLUMNS.contains(&name) {
        return Err(FieldError::NotEditable(name.to_owned()));
    }
    Ok(())
}

/// Editable exam fields. The "attachments" display name maps to the
/// `pdf_path` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExamField {
    Date,
    Notes,
    Attachments,
}

impl ColumnMapped for ExamField {
    fn from_display(name: &str) -> Result<Self, FieldError> {
        reject_non_editable(name)?;
        match name {
            "date" => Ok(ExamField::Date),
            "notes" => Ok(ExamField::Notes),
            "attachments" | "pdf_path" => Ok(ExamField::Attachments),
            other => Err(FieldError::Unknown(other.to_owned())),
        }
    }

    fn column(self) -> &'static str {
        match self {
            ExamField::Date => "date",
            ExamField::Notes => "notes",
            ExamField::Attachments => "pdf_path",
        }
    }
}

/// Editable referral fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferralField {
    Date,
    Reason,
    Status,
}

impl ColumnMapped for ReferralField {
    fn from_display(name: &str) -> Result<Self, FieldError> {
        reject_non_editable(name)?;
        match name {
            "date" => Ok(ReferralField::Date),
            "reason" => Ok(ReferralField::Reason),
            "status" => Ok(ReferralField::Status),
            other => Err(FieldError::Unknown(other.to_owned())),
        }
    }

    fn column(self) -> &'static str {
        match self {
            ReferralField::Date => "date",
            ReferralField::Reason => "reason",
            ReferralField::Status => "status",
        }
    }
}

/// Editable patient fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatientField {
    Name,
    Document,
    Phone,
    BirthDate,
}

impl ColumnMapped for PatientField {
    fn from_display(name: &str) -> Result<Self, FieldError> {
        reject_non_editable(name)?;
        match name {
            "name" => Ok(PatientField::Name),
            "document" => Ok(PatientField::Document),
            "phone" => Ok(PatientField::Phone),
            "birth_date" => Ok(PatientField::BirthDate),
            other => Err(FieldError::Unknown(other.to_owned())),
        }
    }

    fn column(self) -> &'static str {
        match self {
            PatientField::Name => "name",
            PatientField::Document => "document",
            PatientField::Phone => "phone",
            PatientField::BirthDate => "birth_date",
        }
    }
}

/// A validated update payload keyed by storage column.
///
/// Built from (display name, value) pairs; every name passes through the
/// entity's field enum, so only declared, editable columns can appear.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdatePayload {
    columns: BTreeMap<&'static str, Value>,
}

impl UpdatePayload {
    /// Builds a payload from display-named entries.
    ///
    /// # Errors
    ///
    /// `FieldError::NotEditable` / `FieldError::Unknown` for bad names, and
    /// `FieldError::Empty` when nothing editable remains, so callers surface
    /// that case to the user instead of issuing a no-op write.
    pub fn from_entries<F: ColumnMapped>(
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<Self, FieldError> {
        let mut columns = BTreeMap::new();
        for (name, value) in entries {
            let field = F::from_display(&name)?;
            columns.insert(field.column(), value);
        }
        if columns.is_empty() {
            return Err(FieldError::Empty);
        }
        Ok(Self { columns })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.columns.iter().map(|(c, v)| (*c, v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
