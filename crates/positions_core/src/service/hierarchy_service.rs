//! Position hierarchy use-case service.
//!
//! # Responsibility
//! - Assemble nested `PositionTree` snapshots from the flat relation.
//! - Guard hierarchy invariants before delegating writes to the repository.
//!
//! # Invariants
//! - At most one root (`parent_id = None`) exists; checked on create and on
//!   update, and backed by a unique index in the schema.
//! - A non-null parent must reference an existing position.
//! - A position with children is never deleted.
//! - Invariant checks run before any mutating call; a rejected operation
//!   leaves the store untouched.

use crate::model::position::{Position, PositionDraft, PositionId, PositionTree};
use crate::repo::position_repo::{PositionRepoError, PositionRepository};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Structural rule a write would have broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A second root was requested while one already exists.
    RootAlreadyExists,
    /// The target position still has at least one child.
    HasChildren(PositionId),
    /// The referenced parent does not exist.
    ParentNotFound(Option<PositionId>),
    /// An update tried to make a position its own parent.
    SelfParent(PositionId),
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootAlreadyExists => write!(f, "Only one root position is allowed."),
            Self::HasChildren(_) => write!(f, "Cannot delete parent because it has children"),
            Self::ParentNotFound(_) => write!(f, "Parent position not found"),
            Self::SelfParent(_) => write!(f, "A position cannot be its own parent"),
        }
    }
}

/// Errors from hierarchy service operations.
#[derive(Debug)]
pub enum HierarchyServiceError {
    /// Target position does not exist.
    NotFound(PositionId),
    /// Operation rejected to preserve a hierarchy invariant.
    Invariant(InvariantViolation),
    /// Repository-level failure (connectivity, corrupt rows, schema).
    Repo(PositionRepoError),
}

impl Display for HierarchyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "position not found: {id}"),
            Self::Invariant(violation) => write!(f, "{violation}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HierarchyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PositionRepoError> for HierarchyServiceError {
    fn from(value: PositionRepoError) -> Self {
        match value {
            PositionRepoError::RootAlreadyExists => {
                Self::Invariant(InvariantViolation::RootAlreadyExists)
            }
            PositionRepoError::ParentNotFound(parent_id) => {
                Self::Invariant(InvariantViolation::ParentNotFound(parent_id))
            }
            PositionRepoError::HasChildren(id) => {
                Self::Invariant(InvariantViolation::HasChildren(id))
            }
            other => Self::Repo(other),
        }
    }
}

impl From<InvariantViolation> for HierarchyServiceError {
    fn from(value: InvariantViolation) -> Self {
        Self::Invariant(value)
    }
}

pub type HierarchyResult<T> = Result<T, HierarchyServiceError>;

/// Hierarchy engine over an injected position repository.
pub struct HierarchyService<R: PositionRepository> {
    repo: R,
}

impl<R: PositionRepository> HierarchyService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads one position without expanding children.
    pub fn get_one(&self, id: PositionId) -> HierarchyResult<Option<Position>> {
        Ok(self.repo.find_by_id(id)?)
    }

    /// Loads one position and recursively expands its descendants.
    ///
    /// Returns `Ok(None)` when `id` does not exist. Children that disappear
    /// between the parent listing and their own lookup are dropped from the
    /// snapshot instead of failing the read.
    pub fn get_with_children(&self, id: PositionId) -> HierarchyResult<Option<PositionTree>> {
        let mut ancestors = Vec::new();
        self.expand(id, &mut ancestors)
    }

    /// Expands every root into a full tree.
    ///
    /// Normally yields zero or one tree; more than one is returned as-is if the
    /// store ever holds several roots.
    pub fn get_all_with_hierarchy(&self) -> HierarchyResult<Vec<PositionTree>> {
        let roots = self.repo.find_roots()?;
        if roots.len() > 1 {
            warn!(
                "event=hierarchy_read module=hierarchy status=warn reason=multiple_roots root_count={}",
                roots.len()
            );
        }

        let mut trees = Vec::with_capacity(roots.len());
        for root in roots {
            if let Some(tree) = self.get_with_children(root.id)? {
                trees.push(tree);
            }
        }
        Ok(trees)
    }

    /// Creates one position.
    ///
    /// # Errors
    /// - `RootAlreadyExists` when `parent_id` is `None` and a root exists.
    /// - `ParentNotFound` when `parent_id` references a missing position.
    pub fn create(&self, draft: &PositionDraft) -> HierarchyResult<Position> {
        match draft.parent_id {
            None => self.ensure_no_other_root(None)?,
            Some(parent_id) => self.ensure_parent_exists(parent_id)?,
        }

        let created = self
            .repo
            .insert(&draft.name, &draft.description, draft.parent_id)
            .inspect_err(|err| log_rejected("position_create", err))?;
        info!(
            "event=position_create module=hierarchy status=ok position_id={} is_root={}",
            created.id,
            created.is_root()
        );
        Ok(created)
    }

    /// Overwrites name, description and parent of an existing position, then
    /// returns the row as re-read from the store.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `SelfParent` when `parent_id == id`.
    /// - `ParentNotFound` when `parent_id` references a missing position.
    /// - `RootAlreadyExists` when clearing the parent while another root exists.
    ///
    /// Cycles deeper than self-parenting are not detected. Moving the root
    /// under one of its own descendants leaves no root at all, after which
    /// `get_all_with_hierarchy` returns an empty list while the rows remain.
    pub fn update(&self, id: PositionId, draft: &PositionDraft) -> HierarchyResult<Position> {
        self.repo
            .find_by_id(id)?
            .ok_or(HierarchyServiceError::NotFound(id))?;

        match draft.parent_id {
            Some(parent_id) if parent_id == id => {
                return Err(reject("position_update", InvariantViolation::SelfParent(id)));
            }
            Some(parent_id) => self.ensure_parent_exists(parent_id)?,
            None => self.ensure_no_other_root(Some(id))?,
        }

        self.repo
            .update(id, &draft.name, &draft.description, draft.parent_id)
            .inspect_err(|err| log_rejected("position_update", err))?;
        let updated = self
            .repo
            .find_by_id(id)?
            .ok_or(HierarchyServiceError::NotFound(id))?;
        info!(
            "event=position_update module=hierarchy status=ok position_id={} is_root={}",
            id,
            updated.is_root()
        );
        Ok(updated)
    }

    /// Deletes a childless position and returns its pre-delete snapshot.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `HasChildren` when at least one position references `id`.
    pub fn delete(&self, id: PositionId) -> HierarchyResult<Position> {
        let existing = self
            .repo
            .find_by_id(id)?
            .ok_or(HierarchyServiceError::NotFound(id))?;

        let child_count = self.repo.find_by_parent_id(id)?.len();
        if child_count > 0 {
            debug!(
                "event=position_delete module=hierarchy position_id={} child_count={}",
                id, child_count
            );
            return Err(reject("position_delete", InvariantViolation::HasChildren(id)));
        }

        self.repo
            .delete(id)
            .inspect_err(|err| log_rejected("position_delete", err))?;
        info!(
            "event=position_delete module=hierarchy status=ok position_id={}",
            id
        );
        Ok(existing)
    }

    fn expand(
        &self,
        id: PositionId,
        ancestors: &mut Vec<PositionId>,
    ) -> HierarchyResult<Option<PositionTree>> {
        let Some(position) = self.repo.find_by_id(id)? else {
            return Ok(None);
        };

        ancestors.push(id);
        let mut children = Vec::new();
        for child in self.repo.find_by_parent_id(id)? {
            if ancestors.contains(&child.id) {
                warn!(
                    "event=hierarchy_read module=hierarchy status=warn reason=cycle position_id={} child_id={}",
                    id, child.id
                );
                continue;
            }
            if let Some(subtree) = self.expand(child.id, ancestors)? {
                children.push(subtree);
            }
        }
        ancestors.pop();

        Ok(Some(PositionTree { position, children }))
    }

    /// Fails when a root other than `except` already exists.
    fn ensure_no_other_root(&self, except: Option<PositionId>) -> HierarchyResult<()> {
        let conflicting = self
            .repo
            .find_roots()?
            .into_iter()
            .any(|root| Some(root.id) != except);
        if conflicting {
            let operation = if except.is_some() {
                "position_update"
            } else {
                "position_create"
            };
            return Err(reject(operation, InvariantViolation::RootAlreadyExists));
        }
        Ok(())
    }

    fn ensure_parent_exists(&self, parent_id: PositionId) -> HierarchyResult<()> {
        if self.repo.find_by_id(parent_id)?.is_none() {
            return Err(reject(
                "position_write",
                InvariantViolation::ParentNotFound(Some(parent_id)),
            ));
        }
        Ok(())
    }
}

fn reject(event: &str, violation: InvariantViolation) -> HierarchyServiceError {
    warn!(
        "event={event} module=hierarchy status=rejected reason={}",
        violation_code(&violation)
    );
    HierarchyServiceError::Invariant(violation)
}

/// Logs store-level constraint rejections that raced past the pre-checks.
fn log_rejected(event: &str, err: &PositionRepoError) {
    let reason = match err {
        PositionRepoError::RootAlreadyExists => "root_already_exists",
        PositionRepoError::ParentNotFound(_) => "parent_not_found",
        PositionRepoError::HasChildren(_) => "has_children",
        _ => return,
    };
    warn!("event={event} module=hierarchy status=rejected source=store reason={reason}");
}

fn violation_code(violation: &InvariantViolation) -> &'static str {
    match violation {
        InvariantViolation::RootAlreadyExists => "root_already_exists",
        InvariantViolation::HasChildren(_) => "has_children",
        InvariantViolation::ParentNotFound(_) => "parent_not_found",
        InvariantViolation::SelfParent(_) => "self_parent",
    }
}
