use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::VectorClock;
use crate::error::OtError;

/// The edit primitive an [`Operation`] carries.
///
/// `Retain` is named in the wire vocabulary (diff/patch formats commonly
/// carry it) but the engine never produces one; a `Retain` arriving from
/// the wire is rejected with [`OtError::UnknownKind`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Delete,
    Retain,
}

/// An immutable record describing one atomic edit, stamped with enough
/// causal and tie-breaking metadata for every participant to apply it
/// in a mutually convergent way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub position: usize,
    /// Insert: the text being inserted. Delete: the text that was present
    /// at generation time, captured for conflict diagnostics only — the
    /// transform rules never read it.
    pub content: String,
    /// Insert: `content.chars().count()`. Delete: characters removed.
    pub length: usize,
    #[serde(rename = "user_id")]
    pub origin: String,
    #[serde(rename = "timestamp")]
    pub wall_time: i64,
    #[serde(rename = "id")]
    pub op_id: String,
    #[serde(rename = "vector_clock")]
    pub clock: VectorClock,
}

impl Operation {
    pub fn new_insert(
        origin: &str,
        position: usize,
        content: String,
        wall_time: i64,
        clock: VectorClock,
    ) -> Self {
        let length = content.chars().count();
        Self {
            kind: OperationKind::Insert,
            position,
            content,
            length,
            origin: origin.to_string(),
            wall_time,
            op_id: make_op_id(origin, wall_time),
            clock,
        }
    }

    pub fn new_delete(
        origin: &str,
        position: usize,
        length: usize,
        deleted_content: String,
        wall_time: i64,
        clock: VectorClock,
    ) -> Self {
        Self {
            kind: OperationKind::Delete,
            position,
            content: deleted_content,
            length,
            origin: origin.to_string(),
            wall_time,
            op_id: make_op_id(origin, wall_time),
            clock,
        }
    }

    pub fn validate(&self) -> Result<(), OtError> {
        match self.kind {
            OperationKind::Insert | OperationKind::Delete => Ok(()),
            OperationKind::Retain => Err(OtError::UnknownKind),
        }
    }
}

fn make_op_id(origin: &str, wall_time: i64) -> String {
    format!("{origin}-{wall_time}-{}", Uuid::new_v4().simple())
}
