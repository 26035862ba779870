//! file: core/src/policy.rs
//! description: revision -> protocol policy table for context-manager lowering.
//!
//! Every behavioural difference between historical revisions of the
//! resource-management protocol is resolved here, once per construct, into a
//! `Policy`. The reformulation engine consumes the policy and never compares
//! revisions itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ContractViolation, ReformErrorExt};

/// Protocol revision of the source language, ordered `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpecRevision {
    major: u8,
    minor: u8,
}

impl SpecRevision {
    pub const OLDEST: SpecRevision = SpecRevision::new(2, 6);
    pub const NEWEST: SpecRevision = SpecRevision::new(3, 9);

    /// `__enter__`/`__exit__` are looked up on the type only.
    pub const DUNDER_SPECIAL: SpecRevision = SpecRevision::new(2, 7);
    /// The front-end presents every clause of a statement as an explicit list.
    pub const MULTI_ITEM: SpecRevision = SpecRevision::new(3, 3);
    /// `async with` exists.
    pub const ASYNC: SpecRevision = SpecRevision::new(3, 5);
    /// Synchronous enter is called before exit is looked up.
    pub const REORDER: SpecRevision = SpecRevision::new(3, 6);
    /// Exit-related nodes point at the last line of the body.
    pub const LINENO_FIX: SpecRevision = SpecRevision::new(3, 7);
    /// Strict legacy diagnostics no longer changes positions.
    pub const POST_FIX: SpecRevision = SpecRevision::new(3, 8);

    pub const fn new(major: u8, minor: u8) -> Self {
        SpecRevision { major, minor }
    }

    /// All revisions the policy table has an answer for, oldest first.
    pub fn known() -> Vec<SpecRevision> {
        let mut out = vec![SpecRevision::new(2, 6), SpecRevision::new(2, 7)];
        out.extend((0..=9).map(|minor| SpecRevision::new(3, minor)));
        out
    }

    pub fn is_known(&self) -> bool {
        match self.major {
            2 => matches!(self.minor, 6 | 7),
            3 => self.minor <= 9,
            _ => false,
        }
    }
}

impl Default for SpecRevision {
    fn default() -> Self {
        SpecRevision::POST_FIX
    }
}

impl fmt::Display for SpecRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SpecRevision {
    type Err = ContractViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || {
            ContractViolation::new(
                format!("unrecognized revision '{}'", s),
                "reform.policy.SpecRevision::from_str",
                None,
            )
        };
        let (major, minor) = s.trim().split_once('.').ok_or_else(bad)?;
        let major = major.parse::<u8>().map_err(|_| bad())?;
        let minor = minor.parse::<u8>().map_err(|_| bad())?;
        let revision = SpecRevision::new(major, minor);
        if !revision.is_known() {
            return Err(bad());
        }
        Ok(revision)
    }
}

impl TryFrom<String> for SpecRevision {
    type Error = ContractViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpecRevision> for String {
    fn from(value: SpecRevision) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttributeLookupForm {
    /// Ordinary lookup; instance attributes may shadow the hook.
    Plain,
    /// Type-slot lookup that ignores the instance dictionary.
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EnterExitOrder {
    ExitThenEnter,
    EnterThenExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PositionAttribution {
    CompatibleRef,
    DeepestBodyRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InputShape {
    FlattenedSingle,
    ExplicitList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Policy {
    pub attribute_lookup: AttributeLookupForm,
    pub enter_exit_order: EnterExitOrder,
    pub position_attribution: PositionAttribution,
    pub input_shape: InputShape,
    /// Whether the catch-all handler makes the exception current while the
    /// exit hook runs.
    pub publish_exception: bool,
}

/// Resolve the protocol policy for one construct.
///
/// Fails only for revisions outside the table and for asynchronous
/// constructs at revisions that have no such construct.
pub fn resolve(
    revision: SpecRevision,
    is_async: bool,
    strict_legacy_diagnostics: bool,
) -> Result<Policy, Box<dyn ReformErrorExt>> {
    if !revision.is_known() {
        return Err(ContractViolation::new(
            format!("unrecognized revision {}", revision),
            "reform.policy.resolve",
            None,
        )
        .into());
    }
    if is_async && revision < SpecRevision::ASYNC {
        return Err(ContractViolation::new(
            format!("asynchronous context manager at revision {} (requires {})", revision, SpecRevision::ASYNC),
            "reform.policy.resolve",
            None,
        )
        .into());
    }

    let attribute_lookup = if revision < SpecRevision::DUNDER_SPECIAL {
        AttributeLookupForm::Plain
    } else {
        AttributeLookupForm::Special
    };

    let enter_exit_order = if !is_async && revision >= SpecRevision::REORDER {
        EnterExitOrder::EnterThenExit
    } else {
        EnterExitOrder::ExitThenEnter
    };

    let forced_compatible = strict_legacy_diagnostics && revision < SpecRevision::POST_FIX;
    let position_attribution = if revision < SpecRevision::LINENO_FIX || forced_compatible {
        PositionAttribution::CompatibleRef
    } else {
        PositionAttribution::DeepestBodyRef
    };

    let input_shape = if revision < SpecRevision::MULTI_ITEM {
        InputShape::FlattenedSingle
    } else {
        InputShape::ExplicitList
    };

    Ok(Policy {
        attribute_lookup,
        enter_exit_order,
        position_attribution,
        input_shape,
        publish_exception: revision >= SpecRevision::DUNDER_SPECIAL,
    })
}

/// Every valid `(revision, is_async)` combination with its policy, for
/// tooling that wants to show the whole matrix.
pub fn policy_matrix(strict_legacy_diagnostics: bool) -> Vec<(SpecRevision, bool, Policy)> {
    let mut rows = Vec::new();
    for revision in SpecRevision::known() {
        for is_async in [false, true] {
            if let Ok(policy) = resolve(revision, is_async, strict_legacy_diagnostics) {
                rows.push((revision, is_async, policy));
            }
        }
    }
    rows
}
