//! Admission request fixtures for unit tests.

use kube::core::{
    admission::{AdmissionRequest, AdmissionReview},
    DynamicObject,
};
use serde_json::{json, Value};

pub(crate) fn review_json(namespace: &str, operation: &str, object: Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "", "version": "v1", "kind": "Pod"},
            "resource": {"group": "", "version": "v1", "resource": "pods"},
            "name": "",
            "namespace": namespace,
            "operation": operation,
            "userInfo": {"username": "system:serviceaccount:kube-system:replicaset-controller"},
            "object": object,
            "dryRun": false
        }
    })
}

pub(crate) fn request_with_object(
    namespace: &str,
    operation: &str,
    object: Value,
) -> AdmissionRequest<DynamicObject> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_value(review_json(namespace, operation, object)).unwrap();
    review.try_into().unwrap()
}

pub(crate) fn pod_json(containers: &[&str]) -> Value {
    let containers: Vec<Value> = containers
        .iter()
        .map(|name| json!({"name": name, "image": format!("example/{name}:1.0")}))
        .collect();
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"generateName": "web-"},
        "spec": {"containers": containers}
    })
}

pub(crate) fn pod_request(namespace: &str, containers: &[&str]) -> AdmissionRequest<DynamicObject> {
    request_with_object(namespace, "CREATE", pod_json(containers))
}
