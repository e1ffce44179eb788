//! JSON Patch generation.
//!
//! Describes the injection as RFC 6902 `add` operations against the Pod. The
//! operations only ever append: existing containers and volumes keep their
//! positions. Indices are computed from the array lengths observed in this
//! request, so the patch must be applied to exactly that Pod.

use json_patch::{AddOperation, PatchOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

use crate::sidecar::SidecarFragment;
use crate::types::PodSpecView;
use crate::Result;

const CONTAINERS: &str = "containers";
const VOLUMES: &str = "volumes";

/// Generate the patch appending `fragment` to the Pod described by `view`.
///
/// Volumes whose name already exists in the Pod are left out; the container's
/// mount then refers to the existing volume.
///
/// # Errors
///
/// Returns an error if a fragment value cannot be serialized.
pub fn generate_patch(
    view: &PodSpecView,
    fragment: &SidecarFragment,
) -> Result<Vec<PatchOperation>> {
    let container = serde_json::to_value(&fragment.container)?;
    let mut ops = append_ops(CONTAINERS, view.container_names.len(), vec![container]);

    let volumes = fragment
        .volumes
        .iter()
        .filter(|volume| !view.has_volume(&volume.name))
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if !volumes.is_empty() {
        ops.extend(append_ops(VOLUMES, view.volume_names.len(), volumes));
    }

    Ok(ops)
}

/// Append `values` to the `spec` array `field`, which currently holds
/// `existing_len` elements. An empty or absent array is added whole.
fn append_ops(field: &str, existing_len: usize, values: Vec<Value>) -> Vec<PatchOperation> {
    if existing_len == 0 {
        return vec![add(PointerBuf::from_tokens(["spec", field]), Value::Array(values))];
    }

    values
        .into_iter()
        .enumerate()
        .map(|(offset, value)| {
            let index = (existing_len + offset).to_string();
            add(PointerBuf::from_tokens(["spec", field, index.as_str()]), value)
        })
        .collect()
}

fn add(path: PointerBuf, value: Value) -> PatchOperation {
    PatchOperation::Add(AddOperation { path, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::{build_sidecar, CONFIG_VOLUME_NAME, SIDECAR_CONTAINER_NAME};
    use sidecar_injector_core::InjectorConfig;

    fn view(containers: &[&str], volumes: &[&str]) -> PodSpecView {
        PodSpecView {
            container_names: containers.iter().map(ToString::to_string).collect(),
            volume_names: volumes.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    fn add_op(op: &PatchOperation) -> &AddOperation {
        match op {
            PatchOperation::Add(add) => add,
            other => panic!("expected add operation, got {other:?}"),
        }
    }

    #[test]
    fn appends_container_after_existing_ones() {
        let config = InjectorConfig::builder("abc123").build().unwrap();
        let ops = generate_patch(&view(&["app", "proxy"], &[]), &build_sidecar(&config)).unwrap();

        assert_eq!(ops.len(), 1);
        let add = add_op(&ops[0]);
        assert_eq!(add.path.to_string(), "/spec/containers/2");
        assert_eq!(add.value["name"], SIDECAR_CONTAINER_NAME);
    }

    #[test]
    fn creates_containers_array_when_empty() {
        let config = InjectorConfig::builder("abc123").build().unwrap();
        let ops = generate_patch(&view(&[], &[]), &build_sidecar(&config)).unwrap();

        let add = add_op(&ops[0]);
        assert_eq!(add.path.to_string(), "/spec/containers");
        let containers = add.value.as_array().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0]["name"], SIDECAR_CONTAINER_NAME);
    }

    #[test]
    fn volumes_skipped_when_fragment_has_none() {
        let config = InjectorConfig::builder("abc123").build().unwrap();
        let ops = generate_patch(&view(&["app"], &["data"]), &build_sidecar(&config)).unwrap();

        assert!(ops
            .iter()
            .all(|op| !add_op(op).path.to_string().starts_with("/spec/volumes")));
    }

    #[test]
    fn creates_volumes_array_when_pod_has_none() {
        let config = InjectorConfig::builder("abc123")
            .agent_config_map("agent-config")
            .build()
            .unwrap();
        let ops = generate_patch(&view(&["app"], &[]), &build_sidecar(&config)).unwrap();

        assert_eq!(ops.len(), 2);
        let add = add_op(&ops[1]);
        assert_eq!(add.path.to_string(), "/spec/volumes");
        assert_eq!(add.value[0]["name"], CONFIG_VOLUME_NAME);
        assert_eq!(add.value[0]["configMap"]["name"], "agent-config");
    }

    #[test]
    fn appends_volume_after_existing_ones() {
        let config = InjectorConfig::builder("abc123")
            .agent_config_map("agent-config")
            .build()
            .unwrap();
        let ops = generate_patch(&view(&["app"], &["data", "cache"]), &build_sidecar(&config))
            .unwrap();

        let add = add_op(&ops[1]);
        assert_eq!(add.path.to_string(), "/spec/volumes/2");
        assert_eq!(add.value["name"], CONFIG_VOLUME_NAME);
    }

    #[test]
    fn existing_volume_is_not_duplicated() {
        let config = InjectorConfig::builder("abc123")
            .agent_config_map("agent-config")
            .build()
            .unwrap();
        let ops = generate_patch(
            &view(&["app"], &[CONFIG_VOLUME_NAME]),
            &build_sidecar(&config),
        )
        .unwrap();

        assert_eq!(ops.len(), 1);
        assert_eq!(add_op(&ops[0]).path.to_string(), "/spec/containers/1");
    }

    #[test]
    fn serializes_as_rfc6902() {
        let config = InjectorConfig::builder("abc123").build().unwrap();
        let ops = generate_patch(&view(&["app"], &[]), &build_sidecar(&config)).unwrap();
        let value = serde_json::to_value(json_patch::Patch(ops)).unwrap();

        assert_eq!(value[0]["op"], "add");
        assert_eq!(value[0]["path"], "/spec/containers/1");
        assert_eq!(value[0]["value"]["image"], "mackerel/mackerel-container-agent:latest");
    }
}
