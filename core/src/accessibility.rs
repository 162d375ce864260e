//! Accessibility Association Store.
//!
//! Declared accessibility needs belong to the teacher, not to an enrollment. Each
//! enrollment replaces the teacher's whole set; the previous set is not kept.
//!
//! A teacher enrolled in two events therefore has one set of needs for both.

use crate::error::StoreError;
use crate::store::EnrollmentTransaction;
use crate::types::{AccessibilityCategoryId, TeacherId};
use std::collections::BTreeSet;

/// The complete set of accessibility categories a teacher declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherAccessibilityProfile {
    teacher_id: TeacherId,
    categories: BTreeSet<AccessibilityCategoryId>,
}

impl TeacherAccessibilityProfile {
    /// Profile with the given categories; duplicates collapse.
    #[must_use]
    pub fn declared(
        teacher_id: TeacherId,
        categories: impl IntoIterator<Item = AccessibilityCategoryId>,
    ) -> Self {
        Self {
            teacher_id,
            categories: categories.into_iter().collect(),
        }
    }

    /// Profile declaring no needs.
    #[must_use]
    pub const fn none(teacher_id: TeacherId) -> Self {
        Self {
            teacher_id,
            categories: BTreeSet::new(),
        }
    }

    /// Owner of the profile.
    #[must_use]
    pub const fn teacher_id(&self) -> TeacherId {
        self.teacher_id
    }

    /// Declared categories, ascending.
    pub fn categories(&self) -> impl Iterator<Item = AccessibilityCategoryId> + '_ {
        self.categories.iter().copied()
    }

    /// Number of declared categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether no needs are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Replace every association of the profile's teacher with the profile's categories.
///
/// Runs inside the caller's transaction. Returns the number of associations written.
///
/// # Errors
///
/// Returns the storage error of the first failing statement.
pub async fn replace_all(
    tx: &mut dyn EnrollmentTransaction,
    profile: &TeacherAccessibilityProfile,
) -> Result<usize, StoreError> {
    let removed = tx.delete_accessibility(profile.teacher_id()).await?;
    for category in profile.categories() {
        tx.insert_accessibility(profile.teacher_id(), category).await?;
    }
    tracing::debug!(
        teacher_id = %profile.teacher_id(),
        removed,
        written = profile.len(),
        "Replaced accessibility associations"
    );
    Ok(profile.len())
}

/// Current associations of a teacher, ascending by category.
///
/// # Errors
///
/// Returns error if the storage read fails.
pub async fn list_for(
    tx: &mut dyn EnrollmentTransaction,
    teacher_id: TeacherId,
) -> Result<Vec<AccessibilityCategoryId>, StoreError> {
    let mut categories = tx.list_accessibility(teacher_id).await?;
    categories.sort_unstable();
    categories.dedup();
    Ok(categories)
}
