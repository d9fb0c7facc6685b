use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Span;

/// The universal entity kinds this engine detects.
///
/// Percentages are not a top-level kind: the detector reports them as
/// `Measurement` with `measurement_type = "percentage"`. Range indicators
/// exist only as raw entities; normalization folds them into measurement
/// ranges and never assigns them an ID of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Org,
    Loc,
    Gpe,
    Date,
    Time,
    Money,
    Measurement,
    Phone,
    Email,
    Url,
    Regulation,
    RangeIndicator,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Org => "org",
            Self::Loc => "loc",
            Self::Gpe => "gpe",
            Self::Date => "date",
            Self::Time => "time",
            Self::Money => "money",
            Self::Measurement => "measurement",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Url => "url",
            Self::Regulation => "regulation",
            Self::RangeIndicator => "range_indicator",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "person" | "people" => Some(Self::Person),
            "org" | "orgs" => Some(Self::Org),
            "loc" => Some(Self::Loc),
            "gpe" => Some(Self::Gpe),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "money" => Some(Self::Money),
            "measurement" => Some(Self::Measurement),
            "phone" => Some(Self::Phone),
            "email" => Some(Self::Email),
            "url" => Some(Self::Url),
            "regulation" => Some(Self::Regulation),
            "range_indicator" => Some(Self::RangeIndicator),
            _ => None,
        }
    }

    /// Prefix used for document-scoped entity IDs (`p001`, `meas007`, ...).
    /// DATE and TIME share the `d` namespace. Range indicators never receive
    /// an ID; they fold into `meas` ranges.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Person => "p",
            Self::Org => "org",
            Self::Loc => "loc",
            Self::Gpe => "gpe",
            Self::Date | Self::Time => "d",
            Self::Money => "mon",
            Self::Measurement | Self::RangeIndicator => "meas",
            Self::Phone => "tel",
            Self::Email => "mail",
            Self::Url => "url",
            Self::Regulation => "reg",
        }
    }
}

/// A ground-truth record of what a detector saw at a specific byte range,
/// prior to any normalization. Invariant: `markdown[span] == text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    pub kind: EntityKind,
    pub span: Span,
    pub text: String,
    /// Which automaton or named pattern produced the match
    /// (e.g. `gazetteer`, `date_iso`, `measurement_range`).
    pub detector_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

/// A typed metadata value carried on canonical entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// The normalized, ID-bearing record for a real-world referent within one
/// document.
///
/// `mentions` holds indices into the document's `raw_entities` list, ordered
/// by increasing `span.start`. A mention of a different kind may appear here
/// when normalization merged a nested detection into its container (for
/// example a bare year inside a regulation citation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    /// Document-scoped stable ID: kind prefix + zero-padded ordinal.
    pub entity_id: String,
    pub kind: EntityKind,
    /// Type-dependent canonical form (ISO-8601 date, SI measurement, ...).
    pub normalized: String,
    /// Distinct surface forms observed, in first-seen order.
    pub aliases: Vec<String>,
    /// Indices into `DocumentRecord::raw_entities`, in span order.
    pub mentions: Vec<usize>,
    pub count: usize,
    pub metadata: IndexMap<String, MetaValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_prefixes_match_wire_format() {
        assert_eq!(EntityKind::Person.id_prefix(), "p");
        assert_eq!(EntityKind::Date.id_prefix(), "d");
        assert_eq!(EntityKind::Time.id_prefix(), "d");
        assert_eq!(EntityKind::Measurement.id_prefix(), "meas");
        assert_eq!(EntityKind::Regulation.id_prefix(), "reg");
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            EntityKind::Person,
            EntityKind::Gpe,
            EntityKind::Money,
            EntityKind::RangeIndicator,
        ] {
            assert_eq!(EntityKind::from_str(kind.as_str()), Some(kind));
        }
    }
}
