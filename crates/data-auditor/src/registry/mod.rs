//! Declarative check registry.
//!
//! The registry is a static mapping from [`SemanticType`] to the checks that
//! apply to it, plus the dataset-wide checks that run once per audit. It is
//! built once ([`CheckRegistry::builtin`]) and never mutated afterwards;
//! configuration overlays are applied at resolution time and produce fresh
//! [`ResolvedCheck`] values.

mod builtin;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::checks::{CheckContext, DatasetContext};
use crate::config::AuditConfig;
use crate::error::{CheckError, CheckResult};
use crate::types::{Finding, SemanticType, Severity};

/// Threshold meaning "any non-zero value".
pub const ANY: f64 = f64::MIN_POSITIVE;

// ============================================================================
// Threshold tables
// ============================================================================

/// One `(threshold, severity)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTier {
    pub threshold: f64,
    pub severity: Severity,
}

/// Severity-threshold table, ordered from most to least severe.
///
/// A measured value maps to the first tier whose threshold it reaches
/// (`value >= threshold`); values below every tier pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable(Vec<ThresholdTier>);

impl ThresholdTable {
    pub fn new(tiers: Vec<(f64, Severity)>) -> Self {
        Self(
            tiers
                .into_iter()
                .map(|(threshold, severity)| ThresholdTier { threshold, severity })
                .collect(),
        )
    }

    fn from_static(tiers: &[(f64, Severity)]) -> Self {
        Self::new(tiers.to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tiers(&self) -> &[ThresholdTier] {
        &self.0
    }

    /// The first tier reached by `value`, as `(threshold, severity)`.
    pub fn evaluate(&self, value: f64) -> Option<(f64, Severity)> {
        if value.is_nan() {
            return None;
        }
        self.0
            .iter()
            .find(|tier| value >= tier.threshold)
            .map(|tier| (tier.threshold, tier.severity))
    }

    /// Shape rules: non-empty, finite thresholds, no PASS tier, severities
    /// strictly decreasing and thresholds non-increasing down the table.
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("table has no tiers".to_string());
        }
        for tier in &self.0 {
            if !tier.threshold.is_finite() {
                return Err(format!("threshold {} is not finite", tier.threshold));
            }
            if tier.severity == Severity::Pass {
                return Err("PASS cannot be a threshold tier".to_string());
            }
        }
        for pair in self.0.windows(2) {
            if pair[1].severity >= pair[0].severity {
                return Err(format!(
                    "tiers must go from most to least severe ({} listed after {})",
                    pair[1].severity, pair[0].severity
                ));
            }
            if pair[1].threshold > pair[0].threshold {
                return Err(format!(
                    "threshold {} for {} exceeds {} for {}",
                    pair[1].threshold, pair[1].severity, pair[0].threshold, pair[0].severity
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Check definitions
// ============================================================================

/// Per-column check function.
pub type ColumnCheckFn = fn(&CheckContext<'_>) -> CheckResult<Finding>;

/// Dataset-wide check function; may emit several findings.
pub type DatasetCheckFn = fn(&DatasetContext<'_>) -> CheckResult<Vec<Finding>>;

#[derive(Clone, Copy)]
pub enum CheckKind {
    Column(ColumnCheckFn),
    Dataset(DatasetCheckFn),
}

/// Which columns a definition is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScope {
    Types(&'static [SemanticType]),
    Dataset,
}

/// Immutable descriptor of one check.
#[derive(Clone)]
pub struct CheckDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub scope: CheckScope,
    pub kind: CheckKind,
    /// Runs on a stratified sample above the row threshold.
    pub costly: bool,
    pub thresholds: &'static [(f64, Severity)],
    pub params: &'static [(&'static str, f64)],
}

impl std::fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("costly", &self.costly)
            .finish()
    }
}

impl CheckDefinition {
    pub fn default_param(&self, name: &str) -> Option<f64> {
        self.params
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, value)| *value)
    }

    pub fn applies_to(&self, semantic_type: SemanticType) -> bool {
        match self.scope {
            CheckScope::Types(types) => types.contains(&semantic_type),
            CheckScope::Dataset => false,
        }
    }

    pub fn is_dataset_wide(&self) -> bool {
        matches!(self.scope, CheckScope::Dataset)
    }
}

/// A definition with configuration overrides applied.
#[derive(Debug, Clone)]
pub struct ResolvedCheck<'r> {
    pub definition: &'r CheckDefinition,
    pub thresholds: ThresholdTable,
    pub params: BTreeMap<&'static str, f64>,
    pub severity_override: Option<Severity>,
}

impl ResolvedCheck<'_> {
    pub fn id(&self) -> &'static str {
        self.definition.id
    }

    /// Resolved numeric parameter.
    pub fn param(&self, name: &str) -> CheckResult<f64> {
        self.params.get(name).copied().ok_or_else(|| {
            CheckError::computation(format!("{} has no parameter '{}'", self.id(), name))
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Frozen semantic-type to check mapping.
pub struct CheckRegistry {
    definitions: Vec<CheckDefinition>,
    by_id: HashMap<&'static str, usize>,
    by_type: BTreeMap<SemanticType, Vec<usize>>,
    dataset: Vec<usize>,
}

static_assertions::assert_impl_all!(CheckRegistry: Send, Sync);

static BUILTIN: Lazy<CheckRegistry> =
    Lazy::new(|| CheckRegistry::from_definitions(builtin::definitions()));

impl CheckRegistry {
    /// The registry of built-in checks, constructed on first use.
    pub fn builtin() -> &'static CheckRegistry {
        &BUILTIN
    }

    /// Build a registry from definitions. Later duplicates of an id are
    /// ignored.
    pub fn from_definitions(definitions: Vec<CheckDefinition>) -> Self {
        let mut unique: Vec<CheckDefinition> = Vec::with_capacity(definitions.len());
        let mut by_id = HashMap::new();
        for definition in definitions {
            if by_id.contains_key(definition.id) {
                continue;
            }
            by_id.insert(definition.id, unique.len());
            unique.push(definition);
        }

        let mut by_type: BTreeMap<SemanticType, Vec<usize>> = BTreeMap::new();
        let mut dataset = Vec::new();
        for (idx, definition) in unique.iter().enumerate() {
            match definition.scope {
                CheckScope::Types(types) => {
                    for semantic_type in types {
                        by_type.entry(*semantic_type).or_default().push(idx);
                    }
                }
                CheckScope::Dataset => dataset.push(idx),
            }
        }

        Self {
            definitions: unique,
            by_id,
            by_type,
            dataset,
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn definition(&self, id: &str) -> Option<&CheckDefinition> {
        self.by_id.get(id).map(|&idx| &self.definitions[idx])
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CheckDefinition> {
        self.definitions.iter()
    }

    /// Checks for a column of `semantic_type`, in registration order, with
    /// disabled checks removed and overrides applied.
    pub fn applicable_checks(
        &self,
        semantic_type: SemanticType,
        config: &AuditConfig,
    ) -> Vec<ResolvedCheck<'_>> {
        self.by_type
            .get(&semantic_type)
            .map(|indices| self.resolve(indices, config))
            .unwrap_or_default()
    }

    /// Dataset-wide checks with disabled checks removed and overrides applied.
    pub fn dataset_checks(&self, config: &AuditConfig) -> Vec<ResolvedCheck<'_>> {
        self.resolve(&self.dataset, config)
    }

    /// A single check by id, resolved against `config`, whatever its scope.
    /// `None` for unknown or disabled checks.
    pub fn resolve_check(&self, id: &str, config: &AuditConfig) -> Option<ResolvedCheck<'_>> {
        self.by_id
            .get(id)
            .and_then(|&idx| self.resolve(&[idx], config).pop())
    }

    fn resolve(&self, indices: &[usize], config: &AuditConfig) -> Vec<ResolvedCheck<'_>> {
        indices
            .iter()
            .map(|&idx| &self.definitions[idx])
            .filter(|definition| !config.is_disabled(definition.id))
            .map(|definition| {
                let thresholds = config
                    .thresholds
                    .get(definition.id)
                    .cloned()
                    .unwrap_or_else(|| ThresholdTable::from_static(definition.thresholds));
                let params = definition
                    .params
                    .iter()
                    .map(|(name, default)| {
                        (*name, config.param(definition.id, name).unwrap_or(*default))
                    })
                    .collect();
                ResolvedCheck {
                    definition,
                    thresholds,
                    params,
                    severity_override: config.severity_overrides.get(definition.id).copied(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== threshold table tests ====================

    #[test]
    fn test_threshold_evaluate_most_severe_first() {
        let table = ThresholdTable::new(vec![
            (0.5, Severity::Critical),
            (0.2, Severity::High),
            (ANY, Severity::Low),
        ]);
        assert_eq!(table.evaluate(0.6), Some((0.5, Severity::Critical)));
        assert_eq!(table.evaluate(0.2), Some((0.2, Severity::High)));
        assert_eq!(table.evaluate(0.01), Some((ANY, Severity::Low)));
        assert_eq!(table.evaluate(0.0), None);
        assert_eq!(table.evaluate(f64::NAN), None);
    }

    #[test]
    fn test_threshold_validate() {
        assert!(ThresholdTable::new(vec![(0.5, Severity::High), (0.1, Severity::Low)])
            .validate()
            .is_ok());
        assert!(ThresholdTable::new(vec![]).validate().is_err());
        assert!(ThresholdTable::new(vec![(0.5, Severity::Pass)]).validate().is_err());
        assert!(ThresholdTable::new(vec![(0.1, Severity::High), (0.5, Severity::Low)])
            .validate()
            .is_err());
        assert!(ThresholdTable::new(vec![(0.1, Severity::Low), (0.05, Severity::High)])
            .validate()
            .is_err());
        assert!(ThresholdTable::new(vec![(f64::INFINITY, Severity::High)])
            .validate()
            .is_err());
    }

    // ==================== registry tests ====================

    #[test]
    fn test_builtin_tables_are_valid() {
        for definition in CheckRegistry::builtin().definitions() {
            if definition.thresholds.is_empty() {
                continue;
            }
            let table = ThresholdTable::from_static(definition.thresholds);
            assert!(table.validate().is_ok(), "{} has an invalid table", definition.id);
        }
    }

    #[test]
    fn test_universal_checks_apply_to_every_type() {
        let registry = CheckRegistry::builtin();
        let config = AuditConfig::default();
        for semantic_type in SemanticType::ALL {
            let ids: Vec<&str> = registry
                .applicable_checks(semantic_type, &config)
                .iter()
                .map(|c| c.id())
                .collect();
            for universal in
                ["NULL_RATE", "WHITESPACE_ISSUES", "CONSTANT_COLUMN", "NEAR_CONSTANT"]
            {
                assert!(ids.contains(&universal), "{} missing for {}", universal, semantic_type);
            }
        }
    }

    #[test]
    fn test_type_specific_sets() {
        let registry = CheckRegistry::builtin();
        let config = AuditConfig::default();
        let ids = |t: SemanticType| -> Vec<&'static str> {
            registry.applicable_checks(t, &config).iter().map(|c| c.id()).collect()
        };

        assert!(ids(SemanticType::NumericContinuous).contains(&"OUTLIER_IQR"));
        assert!(ids(SemanticType::NumericDiscrete).contains(&"BENFORD_LAW"));
        assert!(ids(SemanticType::Date).contains(&"DATE_FORMAT_MIX"));
        assert!(ids(SemanticType::Email).contains(&"EMAIL_FORMAT"));
        assert!(ids(SemanticType::Email).contains(&"LENGTH_OUTLIERS"));
        assert!(!ids(SemanticType::Email).contains(&"PHONE_FORMAT"));
        assert!(ids(SemanticType::Boolean).contains(&"CLASS_IMBALANCE"));
        assert!(ids(SemanticType::IdCandidate).contains(&"ID_DUPLICATES"));
        assert!(!ids(SemanticType::Mixed).contains(&"OUTLIER_IQR"));
        assert_eq!(ids(SemanticType::Empty).len(), 4);
    }

    #[test]
    fn test_dataset_checks_are_not_type_indexed() {
        let registry = CheckRegistry::builtin();
        let config = AuditConfig::default();
        let dataset: Vec<&str> = registry.dataset_checks(&config).iter().map(|c| c.id()).collect();
        assert!(dataset.contains(&"DUPLICATE_ROWS"));
        assert!(dataset.contains(&"PII_DETECTED"));
        for semantic_type in SemanticType::ALL {
            assert!(
                registry
                    .applicable_checks(semantic_type, &config)
                    .iter()
                    .all(|c| !c.definition.is_dataset_wide())
            );
        }
    }

    #[test]
    fn test_resolution_applies_overrides_without_mutating() {
        let registry = CheckRegistry::builtin();
        let config = AuditConfig::builder()
            .disable_check("BENFORD_LAW")
            .param("OUTLIER_ZSCORE", "z_threshold", 2.0)
            .threshold_table("NULL_RATE", ThresholdTable::new(vec![(0.3, Severity::Critical)]))
            .severity_override("ZERO_VALUES", Severity::Low)
            .build()
            .unwrap();

        let resolved = registry.applicable_checks(SemanticType::NumericContinuous, &config);
        assert!(resolved.iter().all(|c| c.id() != "BENFORD_LAW"));

        let zscore = resolved.iter().find(|c| c.id() == "OUTLIER_ZSCORE").unwrap();
        assert_eq!(zscore.param("z_threshold").unwrap(), 2.0);
        assert!(zscore.param("nope").is_err());

        let null_rate = resolved.iter().find(|c| c.id() == "NULL_RATE").unwrap();
        assert_eq!(null_rate.thresholds.len(), 1);

        let zeros = resolved.iter().find(|c| c.id() == "ZERO_VALUES").unwrap();
        assert_eq!(zeros.severity_override, Some(Severity::Low));

        // a default resolution is unaffected
        let fresh =
            registry.applicable_checks(SemanticType::NumericContinuous, &AuditConfig::default());
        assert!(fresh.iter().any(|c| c.id() == "BENFORD_LAW"));
        let fresh_null = fresh.iter().find(|c| c.id() == "NULL_RATE").unwrap();
        assert_eq!(fresh_null.thresholds.len(), 4);
    }

    #[test]
    fn test_costly_checks() {
        let registry = CheckRegistry::builtin();
        let costly: Vec<&str> = registry
            .definitions()
            .filter(|d| d.costly)
            .map(|d| d.id)
            .collect();
        for id in [
            "OUTLIER_IQR",
            "OUTLIER_ZSCORE",
            "OUTLIER_MODIFIED_Z",
            "TYPO_CANDIDATES",
            "LENGTH_OUTLIERS",
        ] {
            assert!(costly.contains(&id));
        }
        assert_eq!(costly.len(), 5);
    }
}
