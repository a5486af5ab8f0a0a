use crate::rubric::CertificationLevel;

/// Reported when no certification level covers the total.
pub const NO_CERTIFICATION: &str = "No Certification";

/// First level, in rubric order, whose inclusive range contains `total`.
pub(crate) fn resolve(levels: &[CertificationLevel], total: f64) -> Option<&CertificationLevel> {
    levels.iter().find(|level| level.contains(total))
}
