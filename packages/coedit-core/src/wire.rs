//! JSON wire shape for operations.
//!
//! Editors send loosely-typed records such as `{"type": "retain", "count": 6}`. They are
//! validated into the closed [`Operation`] enum at the boundary so nothing past it has to
//! handle unknown kinds or out-of-range counts.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::ops::{Operation, OperationSeq};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOperation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn wire_count(kind: &str, count: Option<i64>) -> Result<usize> {
    let count =
        count.ok_or_else(|| Error::MalformedOperation(format!("{kind} without a count")))?;
    usize::try_from(count)
        .map_err(|_| Error::MalformedOperation(format!("{kind} with invalid count {count}")))
}

fn count_to_wire(kind: &str, n: usize) -> Result<Option<i64>> {
    i64::try_from(n)
        .map(Some)
        .map_err(|_| Error::MalformedOperation(format!("{kind} count {n} does not fit in i64")))
}

/// Reject batches whose consumed or produced length does not fit in `usize`.
fn check_totals(ops: &[Operation]) -> Result<()> {
    let overflow = || Error::MalformedOperation("operation counts overflow".into());
    let mut base = 0usize;
    let mut target = 0usize;
    for op in ops {
        match op {
            Operation::Retain(n) => {
                base = base.checked_add(*n).ok_or_else(overflow)?;
                target = target.checked_add(*n).ok_or_else(overflow)?;
            }
            Operation::Delete(n) => base = base.checked_add(*n).ok_or_else(overflow)?,
            Operation::Insert(text) => {
                target = target
                    .checked_add(text.chars().count())
                    .ok_or_else(overflow)?
            }
        }
    }
    Ok(())
}

impl TryFrom<WireOperation> for Operation {
    type Error = Error;

    fn try_from(wire: WireOperation) -> Result<Self> {
        match wire.kind.as_str() {
            "retain" => Ok(Operation::Retain(wire_count("retain", wire.count)?)),
            "delete" => Ok(Operation::Delete(wire_count("delete", wire.count)?)),
            "insert" => wire
                .text
                .map(Operation::Insert)
                .ok_or_else(|| Error::MalformedOperation("insert without text".into())),
            other => Err(Error::MalformedOperation(format!(
                "unknown operation type {other:?}"
            ))),
        }
    }
}

impl TryFrom<&Operation> for WireOperation {
    type Error = Error;

    fn try_from(op: &Operation) -> Result<Self> {
        let (kind, count, text) = match op {
            Operation::Retain(n) => ("retain", count_to_wire("retain", *n)?, None),
            Operation::Insert(text) => ("insert", None, Some(text.clone())),
            Operation::Delete(n) => ("delete", count_to_wire("delete", *n)?, None),
        };
        Ok(WireOperation {
            kind: kind.to_owned(),
            count,
            text,
        })
    }
}

impl TryFrom<Vec<WireOperation>> for OperationSeq {
    type Error = Error;

    fn try_from(records: Vec<WireOperation>) -> Result<Self> {
        Self::from_wire(records)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireOperation::try_from(self)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl Serialize for OperationSeq {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_wire()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl OperationSeq {
    /// Validate and normalize a batch of wire records.
    pub fn from_wire<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = WireOperation>,
    {
        let ops = records
            .into_iter()
            .map(Operation::try_from)
            .collect::<Result<Vec<Operation>>>()?;
        check_totals(&ops)?;
        Ok(ops.into())
    }

    pub fn to_wire(&self) -> Result<Vec<WireOperation>> {
        self.iter().map(WireOperation::try_from).collect()
    }

    /// Parse a JSON array of wire records.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<WireOperation> = serde_json::from_str(json)
            .map_err(|e| Error::MalformedOperation(e.to_string()))?;
        Self::from_wire(records)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_wire()?)
            .map_err(|e| Error::MalformedOperation(e.to_string()))
    }
}
