//! Hierarchical runtime option registry.
//!
//! Options are dotted names mapping to validated scalar values. The registry
//! supports get/set, introspection via `describe`, and scoped temporary
//! overrides that restore prior values when the guard drops, however the
//! enclosing scope exits.

mod value;

pub use value::OptionValue;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

/// Predicate deciding whether a candidate value is acceptable.
pub type OptionValidator = Arc<dyn Fn(&OptionValue) -> bool + Send + Sync>;

/// Option registry error taxonomy.
#[derive(Debug, Error)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),

    #[error("invalid value for {name}: {reason}")]
    Validation { name: String, reason: String },

    #[error("option already registered: {0}")]
    AlreadyRegistered(String),
}

struct OptionEntry {
    value: OptionValue,
    default: OptionValue,
    validator: OptionValidator,
    validator_desc: String,
}

/// Metadata for one option, returned by `describe`.
#[derive(Debug, Clone, Serialize)]
pub struct OptionDescription {
    pub name: String,
    pub current: OptionValue,
    pub default: OptionValue,
    pub validator: String,
}

struct RegistryInner {
    entries: HashMap<String, OptionEntry>,
    // Registration order, for enumeration only.
    order: Vec<String>,
}

/// Process-wide registry of named, validated options.
pub struct OptionRegistry {
    inner: RwLock<RegistryInner>,
}

impl OptionRegistry {
    /// An empty registry with no options.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner { entries: HashMap::new(), order: Vec::new() }),
        }
    }

    /// A registry pre-populated with the library's built-in options.
    pub fn with_builtin_options() -> Self {
        let registry = Self::new();
        builtin::register_all(&registry);
        registry
    }

    /// Register a new option. Names are unique.
    pub fn register(
        &self,
        name: &str,
        default: OptionValue,
        validator: OptionValidator,
        validator_desc: &str,
    ) -> Result<(), OptionError> {
        let mut inner = self.inner.write();
        if inner.entries.contains_key(name) {
            return Err(OptionError::AlreadyRegistered(name.to_string()));
        }
        if !validator(&default) {
            return Err(OptionError::Validation {
                name: name.to_string(),
                reason: format!("default {} rejected by its own validator", default),
            });
        }
        inner.entries.insert(
            name.to_string(),
            OptionEntry {
                value: default.clone(),
                default,
                validator,
                validator_desc: validator_desc.to_string(),
            },
        );
        inner.order.push(name.to_string());
        Ok(())
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Result<OptionValue, OptionError> {
        let inner = self.inner.read();
        inner
            .entries
            .get(name)
            .map(|e| e.value.clone())
            .ok_or_else(|| OptionError::Unknown(name.to_string()))
    }

    /// Replace the value of `name` after validation.
    ///
    /// On validation failure the stored value is unchanged.
    pub fn set(&self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .get_mut(name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        if !(entry.validator)(&value) {
            return Err(OptionError::Validation {
                name: name.to_string(),
                reason: format!(
                    "{} ({}) rejected: expected {}",
                    value,
                    value.type_name(),
                    entry.validator_desc
                ),
            });
        }
        entry.value = value;
        Ok(())
    }

    /// Restore `name` to its default value.
    pub fn reset(&self, name: &str) -> Result<(), OptionError> {
        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .get_mut(name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        entry.value = entry.default.clone();
        Ok(())
    }

    /// Metadata for one option.
    pub fn describe(&self, name: &str) -> Result<OptionDescription, OptionError> {
        let inner = self.inner.read();
        let entry = inner
            .entries
            .get(name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        Ok(OptionDescription {
            name: name.to_string(),
            current: entry.value.clone(),
            default: entry.default.clone(),
            validator: entry.validator_desc.clone(),
        })
    }

    /// Metadata for every option, in registration order.
    pub fn describe_all(&self) -> Vec<OptionDescription> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner.entries.get(name).map(|entry| OptionDescription {
                    name: name.clone(),
                    current: entry.value.clone(),
                    default: entry.default.clone(),
                    validator: entry.validator_desc.clone(),
                })
            })
            .collect()
    }

    /// Registered option names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    /// Apply `overrides` for the lifetime of the returned guard.
    ///
    /// All overrides are validated before any is applied; the guard restores
    /// every prior value in reverse application order when dropped, including
    /// on panic or early return.
    pub fn scoped_override(
        &self,
        overrides: &[(&str, OptionValue)],
    ) -> Result<OptionGuard<'_>, OptionError> {
        let mut inner = self.inner.write();

        // Validate everything first so a rejected override leaves no partial state.
        for (name, value) in overrides {
            let entry = inner
                .entries
                .get(*name)
                .ok_or_else(|| OptionError::Unknown(name.to_string()))?;
            if !(entry.validator)(value) {
                return Err(OptionError::Validation {
                    name: name.to_string(),
                    reason: format!(
                        "{} ({}) rejected: expected {}",
                        value,
                        value.type_name(),
                        entry.validator_desc
                    ),
                });
            }
        }

        let mut saved = Vec::with_capacity(overrides.len());
        for (name, value) in overrides {
            let entry = inner.entries.get_mut(*name).expect("validated above");
            saved.push((name.to_string(), entry.value.clone()));
            entry.value = value.clone();
        }

        Ok(OptionGuard { registry: self, saved })
    }

    // Restore path for the guard: prior values were valid when recorded, so
    // they bypass validation.
    fn restore(&self, name: &str, value: OptionValue) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(name) {
            entry.value = value;
        }
    }
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::with_builtin_options()
    }
}

/// RAII frame for a scoped override; restores prior values on drop.
#[must_use = "dropping the guard immediately undoes the override"]
pub struct OptionGuard<'a> {
    registry: &'a OptionRegistry,
    saved: Vec<(String, OptionValue)>,
}

impl Drop for OptionGuard<'_> {
    fn drop(&mut self) {
        for (name, value) in self.saved.drain(..).rev() {
            self.registry.restore(&name, value);
        }
    }
}

mod builtin {
    use super::*;

    fn non_negative_int() -> (OptionValidator, &'static str) {
        (
            Arc::new(|v: &OptionValue| matches!(v, OptionValue::Int(i) if *i >= 0)),
            "a non-negative integer",
        )
    }

    fn boolean() -> (OptionValidator, &'static str) {
        (
            Arc::new(|v: &OptionValue| matches!(v, OptionValue::Bool(_))),
            "a boolean",
        )
    }

    fn bitwidth() -> (OptionValidator, &'static str) {
        (
            Arc::new(|v: &OptionValue| matches!(v, OptionValue::Int(32) | OptionValue::Int(64))),
            "32 or 64",
        )
    }

    /// Register the user-facing option surface with documented defaults.
    pub fn register_all(registry: &OptionRegistry) {
        let specs: &[(&str, OptionValue, (OptionValidator, &str))] = &[
            ("display.max_rows", OptionValue::Int(60), non_negative_int()),
            ("display.max_columns", OptionValue::Int(20), non_negative_int()),
            ("mode.pandas_compatible", OptionValue::Bool(false), boolean()),
            ("copy_on_write", OptionValue::Bool(false), boolean()),
            ("default_integer_bitwidth", OptionValue::Int(64), bitwidth()),
            ("default_float_bitwidth", OptionValue::Int(64), bitwidth()),
        ];
        for (name, default, (validator, desc)) in specs {
            registry
                .register(name, default.clone(), validator.clone(), desc)
                .expect("built-in options are unique and have valid defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_value() {
        let registry = OptionRegistry::with_builtin_options();
        registry.set("display.max_rows", OptionValue::Int(100)).unwrap();
        assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(100));
    }

    #[test]
    fn unknown_option_is_surfaced() {
        let registry = OptionRegistry::with_builtin_options();
        assert!(matches!(
            registry.get("display.nope"),
            Err(OptionError::Unknown(_))
        ));
        assert!(matches!(
            registry.set("display.nope", OptionValue::Int(1)),
            Err(OptionError::Unknown(_))
        ));
    }

    #[test]
    fn rejected_value_leaves_stored_value_unchanged() {
        let registry = OptionRegistry::with_builtin_options();
        let result = registry.set("display.max_rows", OptionValue::Int(-1));
        assert!(matches!(result, Err(OptionError::Validation { .. })));
        assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(60));
    }

    #[test]
    fn type_mismatch_fails_validation() {
        let registry = OptionRegistry::with_builtin_options();
        let result = registry.set("mode.pandas_compatible", OptionValue::Int(1));
        assert!(matches!(result, Err(OptionError::Validation { .. })));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = OptionRegistry::with_builtin_options();
        let result = registry.register(
            "display.max_rows",
            OptionValue::Int(0),
            Arc::new(|_| true),
            "anything",
        );
        assert!(matches!(result, Err(OptionError::AlreadyRegistered(_))));
    }

    #[test]
    fn reset_restores_default() {
        let registry = OptionRegistry::with_builtin_options();
        registry.set("copy_on_write", OptionValue::Bool(true)).unwrap();
        registry.reset("copy_on_write").unwrap();
        assert_eq!(registry.get("copy_on_write").unwrap(), OptionValue::Bool(false));
    }

    #[test]
    fn describe_reports_current_and_default() {
        let registry = OptionRegistry::with_builtin_options();
        registry.set("display.max_rows", OptionValue::Int(5)).unwrap();
        let desc = registry.describe("display.max_rows").unwrap();
        assert_eq!(desc.current, OptionValue::Int(5));
        assert_eq!(desc.default, OptionValue::Int(60));
        assert!(!desc.validator.is_empty());
    }

    #[test]
    fn describe_all_preserves_registration_order() {
        let registry = OptionRegistry::new();
        for name in ["b.second", "a.first", "c.third"] {
            registry
                .register(name, OptionValue::Int(0), Arc::new(|_| true), "anything")
                .unwrap();
        }
        let names: Vec<String> =
            registry.describe_all().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b.second", "a.first", "c.third"]);
    }

    #[test]
    fn scoped_override_restores_on_drop() {
        let registry = OptionRegistry::with_builtin_options();
        {
            let _guard = registry
                .scoped_override(&[
                    ("display.max_rows", OptionValue::Int(3)),
                    ("copy_on_write", OptionValue::Bool(true)),
                ])
                .unwrap();
            assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(3));
            assert_eq!(registry.get("copy_on_write").unwrap(), OptionValue::Bool(true));
        }
        assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(60));
        assert_eq!(registry.get("copy_on_write").unwrap(), OptionValue::Bool(false));
    }

    #[test]
    fn scoped_override_restores_on_panic() {
        let registry = OptionRegistry::with_builtin_options();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = registry
                .scoped_override(&[("display.max_rows", OptionValue::Int(1))])
                .unwrap();
            panic!("scoped body failed");
        }));
        assert!(result.is_err());
        assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(60));
    }

    #[test]
    fn invalid_override_applies_nothing() {
        let registry = OptionRegistry::with_builtin_options();
        let result = registry.scoped_override(&[
            ("display.max_rows", OptionValue::Int(3)),
            ("display.max_columns", OptionValue::Int(-1)),
        ]);
        assert!(matches!(result, Err(OptionError::Validation { .. })));
        assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(60));
    }

    #[test]
    fn nested_overrides_unwind_in_reverse() {
        let registry = OptionRegistry::with_builtin_options();
        let outer = registry
            .scoped_override(&[("display.max_rows", OptionValue::Int(10))])
            .unwrap();
        {
            let _inner = registry
                .scoped_override(&[("display.max_rows", OptionValue::Int(20))])
                .unwrap();
            assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(20));
        }
        assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(10));
        drop(outer);
        assert_eq!(registry.get("display.max_rows").unwrap(), OptionValue::Int(60));
    }
}
