//! Entity and fact records produced by extraction.
//!
//! The serialized shape of these records is a stable contract for any
//! persistence layer built on top: field names are camelCase and
//! `entityType` / `method` values are lowercase strings.

use serde::{Deserialize, Serialize};

/// Types of entities that can be tracked in story memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// A person or named character.
    Character,
    /// A geographic location or place.
    Location,
    /// An item, artifact, or product.
    Object,
    /// A significant event.
    Event,
    /// An organization, faction, or group.
    Organization,
    /// Anything else worth remembering; also the fallback for
    /// unrecognized labels.
    Concept,
}

impl EntityType {
    /// Get the display name for this entity type.
    pub fn name(&self) -> &'static str {
        match self {
            EntityType::Character => "character",
            EntityType::Location => "location",
            EntityType::Object => "object",
            EntityType::Event => "event",
            EntityType::Organization => "organization",
            EntityType::Concept => "concept",
        }
    }

    /// Map a raw token-classification label to a canonical type.
    ///
    /// Unmapped labels default to [`EntityType::Concept`].
    pub fn from_label(label: &str) -> Self {
        match label {
            "PER" | "PERSON" => EntityType::Character,
            "LOC" | "LOCATION" | "GPE" | "FACILITY" => EntityType::Location,
            "ORG" | "ORGANIZATION" => EntityType::Organization,
            "PRODUCT" | "ARTIFACT" | "WEAPON" => EntityType::Object,
            "EVENT" => EntityType::Event,
            _ => EntityType::Concept,
        }
    }

    /// Parse a classifier answer token ("org" is accepted as shorthand).
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "character" => Some(EntityType::Character),
            "location" => Some(EntityType::Location),
            "object" => Some(EntityType::Object),
            "event" => Some(EntityType::Event),
            "organization" | "org" => Some(EntityType::Organization),
            "concept" => Some(EntityType::Concept),
            _ => None,
        }
    }
}

/// How a fact was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactMethod {
    /// Extracted by the language model.
    Llm,
    /// Extracted by a regex rule.
    Rule,
}

/// Where in the original text a fact's source sentence lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Caller-supplied time identifier for this ingestion.
    pub time_id: String,
    /// Byte offset of the source sentence in the original text.
    pub start: usize,
    /// Byte offset one past the end of the source sentence.
    pub end: usize,
}

impl Evidence {
    /// Create a new evidence span.
    pub fn new(time_id: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            time_id: time_id.into(),
            start,
            end,
        }
    }
}

/// A time-stamped fact about an entity, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    /// Natural-language statement about the owning entity. Never contains
    /// information absent from `source_text`.
    pub fact: String,
    /// The exact sentence the fact was derived from.
    pub source_text: String,
    /// Offsets of `source_text` within the original input.
    pub evidence: Evidence,
    /// Derivation-method-dependent score in [0, 1].
    pub confidence: f64,
    /// Derivation path.
    pub method: FactMethod,
}

impl Fact {
    /// Create a new fact. Confidence is rounded to three decimals.
    pub fn new(
        fact: impl Into<String>,
        source_text: impl Into<String>,
        evidence: Evidence,
        confidence: f64,
        method: FactMethod,
    ) -> Self {
        Self {
            fact: fact.into(),
            source_text: source_text.into(),
            evidence,
            confidence: (confidence * 1000.0).round() / 1000.0,
            method,
        }
    }

    /// Deduplication key: normalized fact text plus evidence span.
    pub fn dedup_key(&self) -> (String, usize, usize) {
        (
            self.fact.trim().to_lowercase(),
            self.evidence.start,
            self.evidence.end,
        )
    }
}

/// A canonical entity record: the single merged representation of all
/// surface forms of one referent within one extraction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Sequentially assigned identifier, unique within one ingestion batch.
    pub id: String,
    /// What kind of entity this is.
    pub entity_type: EntityType,
    /// Canonical display surface form (possessive-stripped).
    pub name: String,
    /// Alternate surface forms observed for the same identity.
    pub aliases: Vec<String>,
    /// Facts attached to this entity, in extraction order.
    pub facts: Vec<Fact>,
    /// Highest observed classification confidence across merged forms.
    pub confidence: f64,
    /// Incremented on every merge or update.
    pub version: u32,
    /// Time identifier of the first mention.
    pub first_mentioned_at: String,
    /// Time identifier of the latest update.
    pub last_updated_at: String,
}

impl Entity {
    /// Create a new entity record.
    pub fn new(
        id: impl Into<String>,
        entity_type: EntityType,
        name: impl Into<String>,
        confidence: f64,
        time_id: impl Into<String>,
    ) -> Self {
        let time_id = time_id.into();
        Self {
            id: id.into(),
            entity_type,
            name: name.into(),
            aliases: Vec::new(),
            facts: Vec::new(),
            confidence,
            version: 1,
            first_mentioned_at: time_id.clone(),
            last_updated_at: time_id,
        }
    }

    /// Format a sequential entity identifier.
    pub fn format_id(counter: usize) -> String {
        format!("ent_{counter:06}")
    }

    /// Parse the counter back out of a sequential identifier.
    pub fn id_counter(id: &str) -> Option<usize> {
        id.strip_prefix("ent_")?.parse().ok()
    }
}
