//! Admission decision engine.
//!
//! Ties the filter, the sidecar builder and the patch generator together and
//! wraps the outcome in an admission response. The engine fails open: every
//! error path produces an allowed response without a patch.

use json_patch::PatchOperation;
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    DynamicObject,
};
use serde::Deserialize;
use serde_json::Value;
use sidecar_injector_core::InjectorConfig;
use tracing::{debug, error, info, warn};

use crate::filter::{self, Eligibility, SkipReason};
use crate::patch::generate_patch;
use crate::sidecar::build_sidecar;
use crate::types::PodSpecView;
use crate::{InjectorError, Result};

/// What the engine decided for a request.
#[derive(Debug)]
pub enum Decision {
    /// Pass the Pod through unchanged.
    Skip(SkipReason),
    /// Apply these operations to the Pod.
    Inject {
        /// The Pod the patch was computed against.
        pod: PodSpecView,
        /// Operations appending the sidecar.
        ops: Vec<PatchOperation>,
    },
    /// The Pod was eligible but the patch could not be built. The Pod is
    /// passed through unchanged.
    Failed(InjectorError),
}

impl Decision {
    /// Check if the decision mutates the Pod.
    #[must_use]
    pub const fn is_inject(&self) -> bool {
        matches!(self, Self::Inject { .. })
    }
}

/// Evaluate a request without building the response envelope.
#[must_use]
pub fn evaluate(request: &AdmissionRequest<DynamicObject>, config: &InjectorConfig) -> Decision {
    if !filter::is_supported_operation(&request.operation) {
        return Decision::Skip(SkipReason::UnsupportedOperation(request.operation.clone()));
    }

    let pod = match filter::check(request, config) {
        Eligibility::Eligible(pod) => pod,
        Eligibility::Ineligible(reason) => return Decision::Skip(reason),
    };

    let fragment = build_sidecar(config);
    match generate_patch(&pod, &fragment) {
        Ok(ops) => Decision::Inject { pod, ops },
        Err(e) => Decision::Failed(e),
    }
}

/// Decide on an admission request.
///
/// The response always echoes the request uid and always allows the Pod. It
/// carries a JSON patch only when the sidecar is injected.
#[must_use]
pub fn decide(
    request: &AdmissionRequest<DynamicObject>,
    config: &InjectorConfig,
) -> AdmissionResponse {
    respond(request, evaluate(request, config))
}

/// Turn a decision into the response for `request`, logging the outcome.
#[must_use]
pub fn respond(request: &AdmissionRequest<DynamicObject>, decision: Decision) -> AdmissionResponse {
    let uid = request.uid.as_str();
    let namespace = request.namespace.as_deref().unwrap_or_default();

    let (pod, ops) = match decision {
        Decision::Skip(SkipReason::Malformed(e)) | Decision::Failed(e) => {
            log_failure(uid, namespace, &e);
            return AdmissionResponse::from(request);
        }
        Decision::Skip(reason) => {
            debug!(uid = %uid, namespace = %namespace, reason = %reason, "Skipping injection");
            return AdmissionResponse::from(request);
        }
        Decision::Inject { pod, ops } => (pod, ops),
    };

    let op_count = ops.len();
    match AdmissionResponse::from(request).with_patch(json_patch::Patch(ops)) {
        Ok(response) => {
            info!(
                uid = %uid,
                namespace = %namespace,
                pod = %pod.display_name(),
                patch_ops = op_count,
                "Injecting sidecar"
            );
            response
        }
        Err(e) => {
            error!(
                uid = %uid,
                namespace = %namespace,
                pod = %pod.display_name(),
                error = %e,
                "Failed to serialize patch, allowing pod unchanged"
            );
            AdmissionResponse::from(request)
        }
    }
}

/// Answer a full admission review.
///
/// # Errors
///
/// Returns [`InjectorError::MissingRequest`] if the review has no request;
/// there is no uid to answer in that case.
pub fn review(
    body: AdmissionReview<DynamicObject>,
    config: &InjectorConfig,
) -> Result<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> =
        body.try_into().map_err(|_| InjectorError::MissingRequest)?;
    Ok(decide(&request, config).into_review())
}

/// Answer an admission review given as raw JSON.
///
/// An object that does not even fit the generic object schema (say, a
/// string where labels belong) still gets an allowed response echoing the
/// request uid.
///
/// # Errors
///
/// Returns [`InjectorError::MalformedReview`] if the envelope cannot be read
/// once the objects are set aside, and [`InjectorError::MissingRequest`] if
/// it has no request.
pub fn review_value(
    body: Value,
    config: &InjectorConfig,
) -> Result<AdmissionReview<DynamicObject>> {
    let parse_error = match AdmissionReview::<DynamicObject>::deserialize(&body) {
        Ok(parsed) => return review(parsed, config),
        Err(e) => e,
    };

    let mut envelope = body;
    if let Some(request) = envelope.get_mut("request").and_then(Value::as_object_mut) {
        request.remove("object");
        request.remove("oldObject");
    }
    let stripped: AdmissionReview<DynamicObject> =
        serde_json::from_value(envelope).map_err(InjectorError::MalformedReview)?;
    let request: AdmissionRequest<DynamicObject> =
        stripped.try_into().map_err(|_| InjectorError::MissingRequest)?;

    let malformed = InjectorError::MalformedPod(parse_error.to_string());
    Ok(respond(&request, Decision::Skip(SkipReason::Malformed(malformed))).into_review())
}

fn log_failure(uid: &str, namespace: &str, e: &InjectorError) {
    if e.is_malformed_input() {
        warn!(
            uid = %uid,
            namespace = %namespace,
            error = %e,
            "Malformed pod, allowing unchanged"
        );
    } else {
        error!(
            uid = %uid,
            namespace = %namespace,
            error = %e,
            "Failed to build sidecar patch, allowing pod unchanged"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::SIDECAR_CONTAINER_NAME;
    use crate::testing::{pod_json, pod_request, request_with_object, review_json};
    use serde_json::json;

    const UID: &str = "705ab4f5-6393-11e8-b7cc-42010a800002";

    fn config() -> InjectorConfig {
        InjectorConfig::builder("abc123")
            .kubelet_port(10250)
            .kubelet_insecure_tls(true)
            .ignore_namespace("kube-system")
            .build()
            .unwrap()
    }

    fn patch_of(response: &AdmissionResponse) -> Option<Value> {
        response
            .patch
            .as_ref()
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
    }

    fn response_of(review: AdmissionReview<DynamicObject>) -> AdmissionResponse {
        review.response.expect("review carries a response")
    }

    #[test]
    fn injects_into_eligible_pod() {
        let request = pod_request("default", &["app"]);
        let response = decide(&request, &config());

        assert!(response.allowed);
        assert_eq!(response.uid, request.uid);

        let patch = patch_of(&response).expect("patch");
        assert_eq!(patch.as_array().unwrap().len(), 1);
        assert_eq!(patch[0]["op"], "add");
        assert_eq!(patch[0]["path"], "/spec/containers/1");
        assert_eq!(patch[0]["value"]["name"], SIDECAR_CONTAINER_NAME);
    }

    #[test]
    fn ignored_namespace_passes_through() {
        let request = pod_request("kube-system", &["app"]);
        let response = decide(&request, &config());

        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert_eq!(response.uid, request.uid);
    }

    #[test]
    fn non_create_operations_pass_through() {
        for operation in ["UPDATE", "DELETE", "CONNECT"] {
            let request = request_with_object("default", operation, pod_json(&["app"]));
            let decision = evaluate(&request, &config());
            assert!(
                matches!(decision, Decision::Skip(SkipReason::UnsupportedOperation(_))),
                "{operation} should be skipped"
            );

            let response = decide(&request, &config());
            assert!(response.allowed);
            assert!(response.patch.is_none());
        }
    }

    #[test]
    fn malformed_pod_fails_open() {
        let request = request_with_object(
            "default",
            "CREATE",
            json!({"metadata": {}, "spec": {"containers": [{"image": 7}]}}),
        );
        let response = decide(&request, &config());

        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert_eq!(response.uid, request.uid);
    }

    #[test]
    fn construction_failure_fails_open() {
        let request = pod_request("default", &["app"]);
        let cause = serde_json::from_str::<Value>("{").unwrap_err();
        let failure = InjectorError::from(cause);
        assert!(!failure.is_malformed_input());

        let response = respond(&request, Decision::Failed(failure));

        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert_eq!(response.uid, request.uid);
    }

    #[test]
    fn evaluate_reports_injection() {
        let request = pod_request("default", &["app"]);
        match evaluate(&request, &config()) {
            Decision::Inject { pod, ops } => {
                assert_eq!(pod.container_names, vec!["app"]);
                assert_eq!(ops.len(), 1);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn review_wraps_response() {
        let body: AdmissionReview<DynamicObject> =
            serde_json::from_value(review_json("default", "CREATE", pod_json(&["app"]))).unwrap();
        let out = review(body, &config()).unwrap();
        let value = serde_json::to_value(&out).unwrap();

        assert_eq!(value["kind"], "AdmissionReview");
        assert_eq!(value["response"]["uid"], UID);
        assert_eq!(value["response"]["allowed"], true);
        assert_eq!(value["response"]["patchType"], "JSONPatch");
    }

    #[test]
    fn review_without_request_is_an_error() {
        let body: AdmissionReview<DynamicObject> = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview"
        }))
        .unwrap();

        assert!(matches!(
            review(body, &config()),
            Err(InjectorError::MissingRequest)
        ));
    }

    #[test]
    fn review_value_injects_well_formed_pod() {
        let body = review_json("default", "CREATE", pod_json(&["app"]));
        let response = response_of(review_value(body, &config()).unwrap());

        assert!(response.allowed);
        assert_eq!(response.uid, UID);
        assert!(patch_of(&response).is_some());
    }

    #[test]
    fn review_value_allows_object_with_string_labels() {
        let object = json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web-0", "labels": "x"},
            "spec": {"containers": [{"name": "app"}]}
        });
        let body = review_json("default", "CREATE", object);
        let response = response_of(review_value(body, &config()).unwrap());

        assert!(response.allowed);
        assert_eq!(response.uid, UID);
        assert!(response.patch.is_none());
    }

    #[test]
    fn review_value_allows_non_object_pod() {
        let body = review_json("default", "CREATE", json!(42));
        let response = response_of(review_value(body, &config()).unwrap());

        assert!(response.allowed);
        assert_eq!(response.uid, UID);
        assert!(response.patch.is_none());
    }

    #[test]
    fn review_value_rejects_unreadable_envelope() {
        let mut body = review_json("default", "CREATE", json!(42));
        body["request"]["uid"] = json!(17);

        assert!(matches!(
            review_value(body, &config()),
            Err(InjectorError::MalformedReview(_))
        ));
    }

    #[test]
    fn review_value_without_request_is_an_error() {
        let body = json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"});

        assert!(matches!(
            review_value(body, &config()),
            Err(InjectorError::MissingRequest)
        ));
    }
}
