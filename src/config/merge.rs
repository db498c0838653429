//! Layer merge logic
//!
//! Implements the flat last-defined-wins merge across layers in precedence
//! order. Each variable keeps the origin of its winning definition. A name's
//! assignment form (`_set` vs `export`) is fixed by the first layer that
//! defines it; redefining with the other form is a conflict.

use std::collections::BTreeMap;

use super::layer::{Layer, LayerOrigin, VarForm};

/// A merged variable before interpolation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedVar {
    /// Raw (uninterpolated) value from the winning layer
    pub raw_value: String,
    /// Assignment form, fixed by the first defining layer
    pub form: VarForm,
    /// Layer that supplied the winning value
    pub origin: LayerOrigin,
}

/// Errors during layer merge
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(
        "variable {name} defined as `{first_form}` in {first_origin} layer \
         but redefined as `{second_form}` in {second_origin} layer"
    )]
    FormConflict {
        name: String,
        first_form: &'static str,
        first_origin: LayerOrigin,
        second_form: &'static str,
        second_origin: LayerOrigin,
    },
}

/// Merge layers in precedence order (first is base, last has highest precedence).
///
/// Within a single layer, later statements override earlier ones for the same
/// name, matching shell sourcing order. The returned map is keyed by variable
/// name; iteration order is name order, so the merge result is deterministic
/// for a given layer set.
pub fn merge_layers(layers: &[Layer]) -> Result<BTreeMap<String, MergedVar>, MergeError> {
    let mut merged: BTreeMap<String, MergedVar> = BTreeMap::new();
    // Form and origin of the FIRST definition, kept for conflict diagnostics
    let mut first_seen: BTreeMap<String, (VarForm, LayerOrigin)> = BTreeMap::new();

    for layer in layers {
        for assignment in &layer.assignments {
            match first_seen.get(&assignment.name) {
                Some((form, first_origin)) if *form != assignment.form => {
                    return Err(MergeError::FormConflict {
                        name: assignment.name.clone(),
                        first_form: form.keyword(),
                        first_origin: *first_origin,
                        second_form: assignment.form.keyword(),
                        second_origin: layer.origin,
                    });
                }
                Some(_) => {}
                None => {
                    first_seen.insert(assignment.name.clone(), (assignment.form, layer.origin));
                }
            }

            merged.insert(
                assignment.name.clone(),
                MergedVar {
                    raw_value: assignment.value.clone(),
                    form: assignment.form,
                    origin: layer.origin,
                },
            );
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::layer::Assignment;

    fn layer(origin: LayerOrigin, vars: &[(&str, &str, VarForm)]) -> Layer {
        Layer {
            origin,
            path: None,
            digest: None,
            assignments: vars
                .iter()
                .enumerate()
                .map(|(i, (name, value, form))| Assignment {
                    name: name.to_string(),
                    value: value.to_string(),
                    form: *form,
                    line: i + 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_last_layer_wins() {
        let layers = vec![
            layer(LayerOrigin::Defaults, &[("A", "1", VarForm::Set)]),
            layer(LayerOrigin::Deployment, &[("A", "2", VarForm::Set)]),
        ];

        let merged = merge_layers(&layers).unwrap();
        let var = &merged["A"];
        assert_eq!(var.raw_value, "2");
        assert_eq!(var.origin, LayerOrigin::Deployment);
    }

    #[test]
    fn test_unrelated_keys_preserved() {
        let layers = vec![
            layer(
                LayerOrigin::Defaults,
                &[("A", "1", VarForm::Set), ("B", "b", VarForm::Set)],
            ),
            layer(LayerOrigin::DeploymentLocal, &[("A", "override", VarForm::Set)]),
        ];

        let merged = merge_layers(&layers).unwrap();
        assert_eq!(merged["A"].raw_value, "override");
        assert_eq!(merged["B"].raw_value, "b");
        assert_eq!(merged["B"].origin, LayerOrigin::Defaults);
    }

    #[test]
    fn test_later_statement_wins_within_layer() {
        let layers = vec![layer(
            LayerOrigin::Deployment,
            &[("A", "first", VarForm::Set), ("A", "second", VarForm::Set)],
        )];

        let merged = merge_layers(&layers).unwrap();
        assert_eq!(merged["A"].raw_value, "second");
    }

    #[test]
    fn test_form_conflict_across_layers() {
        let layers = vec![
            layer(
                LayerOrigin::Deployment,
                &[("TF_DATA_DIR", ".terraform", VarForm::Export)],
            ),
            layer(LayerOrigin::RootLocal, &[("TF_DATA_DIR", "/tmp/tf", VarForm::Set)]),
        ];

        let err = merge_layers(&layers).unwrap_err();
        let MergeError::FormConflict {
            name,
            first_form,
            second_form,
            second_origin,
            ..
        } = err;
        assert_eq!(name, "TF_DATA_DIR");
        assert_eq!(first_form, "export");
        assert_eq!(second_form, "_set");
        assert_eq!(second_origin, LayerOrigin::RootLocal);
    }

    #[test]
    fn test_same_form_override_allowed() {
        let layers = vec![
            layer(LayerOrigin::Deployment, &[("PATH_EXT", "/a", VarForm::Export)]),
            layer(LayerOrigin::RootLocal, &[("PATH_EXT", "/b", VarForm::Export)]),
        ];

        let merged = merge_layers(&layers).unwrap();
        assert_eq!(merged["PATH_EXT"].raw_value, "/b");
        assert_eq!(merged["PATH_EXT"].form, VarForm::Export);
    }

    #[test]
    fn test_merge_deterministic() {
        let layers = vec![
            layer(
                LayerOrigin::Defaults,
                &[("Z", "z", VarForm::Set), ("A", "a", VarForm::Set)],
            ),
            layer(LayerOrigin::Deployment, &[("M", "m", VarForm::Export)]),
        ];

        let first = merge_layers(&layers).unwrap();
        let second = merge_layers(&layers).unwrap();
        assert_eq!(first, second);

        let names: Vec<_> = first.keys().cloned().collect();
        assert_eq!(names, vec!["A", "M", "Z"]);
    }

    #[test]
    fn test_empty_layers() {
        let merged = merge_layers(&[]).unwrap();
        assert!(merged.is_empty());
    }
}
