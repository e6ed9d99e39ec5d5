// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! End-to-end forward passes through assembled pipelines, with
//! hand-computed expectations.

use std::sync::Arc;

use auto_tuner::{FsTuningStore, MemoryTuningStore, TuningStore};
use model_ir::{NetworkDef, NetworkManifest};
use runtime::backend::CpuVectorBackend;
use runtime::params::{ConvParams, FcParams, MemoryParamStore};
use runtime::{NetworkPipeline, RuntimeError};
use tensor_core::{Blob, Tensor4};

/// A four-class network whose arithmetic works out by hand: on an
/// all-ones 3x8x8 input, filter f (all taps `0.01 * (f + 1)`, bias
/// `0.1 * f`) convolves to `0.27 * (f + 1) + 0.1 * f` at every interior
/// position, both max-pool stages preserve exactly that value, and the
/// softmax sees scores [0.27, 0.64, 1.01, 1.38].
fn classifier_manifest(mode: &str, auto_tuning: &str) -> String {
    format!(
        r#"{{
            "name": "handcheck", "execution_mode": "{mode}",
            "auto_tuning": "{auto_tuning}", "allocated_ram_mb": 8,
            "layers": [
                {{ "name": "conv1", "type": "Convolution",
                   "parameters_file": "conv1.params",
                   "pad": 1, "stride": 1, "group": 1 }},
                {{ "name": "relu1", "type": "ReLU" }},
                {{ "name": "pool1", "type": "Pooling",
                   "pool": "max", "kernel_size": 2, "pad": 0, "stride": 2 }},
                {{ "name": "pool2", "type": "Pooling",
                   "pool": "max", "kernel_size": 4, "pad": 0, "stride": 4 }},
                {{ "name": "prob", "type": "Softmax" }},
                {{ "name": "acc", "type": "Accuracy",
                   "parameters_file": "labels.params", "topk": 1 }}
            ]
        }}"#
    )
}

fn classifier_params() -> Arc<MemoryParamStore> {
    let store = MemoryParamStore::new();
    let mut weights = Vec::with_capacity(4 * 3 * 9);
    for f in 0..4 {
        weights.extend(std::iter::repeat(0.01 * (f + 1) as f32).take(3 * 9));
    }
    store.insert_conv(
        "conv1.params",
        ConvParams {
            weights: Tensor4::from_vec(4, 3, 3, 3, weights).unwrap(),
            bias: (0..4).map(|f| 0.1 * f as f32).collect(),
        },
    );
    // class 3 carries the highest score on the all-ones input
    store.insert_labels("labels.params", vec![3]);
    Arc::new(store)
}

fn build(
    mode: &str,
    auto_tuning: &str,
    params: Arc<MemoryParamStore>,
    tuning: Arc<dyn TuningStore>,
) -> NetworkPipeline {
    let manifest = NetworkManifest::from_json(&classifier_manifest(mode, auto_tuning)).unwrap();
    let def = NetworkDef::resolve(&manifest).unwrap();
    NetworkPipeline::build(&def, params, tuning, Arc::new(CpuVectorBackend::new())).unwrap()
}

fn all_ones_input() -> Blob {
    Blob::Rank4(Tensor4::from_vec(1, 3, 8, 8, vec![1.0; 3 * 64]).unwrap())
}

// softmax of [0.27, 0.64, 1.01, 1.38] with base 2.71828
const EXPECTED_PROBS: [f32; 4] = [0.131_960_5, 0.191_043_7, 0.276_580_6, 0.400_415_2];

#[test]
fn test_hand_computed_classification_sequential() {
    let mut pipeline = build(
        "sequential",
        "off",
        classifier_params(),
        Arc::new(MemoryTuningStore::new()),
    );
    run_and_check(&mut pipeline);
}

#[test]
fn test_hand_computed_classification_parallel() {
    let mut pipeline = build(
        "parallel",
        "off",
        classifier_params(),
        Arc::new(MemoryTuningStore::new()),
    );
    run_and_check(&mut pipeline);
}

#[test]
fn test_hand_computed_classification_parallel_with_tuning() {
    let mut pipeline = build(
        "parallel",
        "on",
        classifier_params(),
        Arc::new(MemoryTuningStore::new()),
    );
    // first pass tunes, second runs the persisted winners
    run_and_check(&mut pipeline);
    run_and_check(&mut pipeline);
}

fn run_and_check(pipeline: &mut NetworkPipeline) {
    let (out, metrics) = pipeline.compute(all_ones_input()).unwrap();
    match out {
        Blob::Scalar(accuracy) => assert!((accuracy - 1.0).abs() < 1e-6),
        other => panic!("expected scalar accuracy, got {}", other.shape_string()),
    }
    // the softmax layer's output is visible through the metrics shapes
    let prob = metrics
        .layers
        .iter()
        .find(|l| l.name == "prob")
        .expect("softmax ran");
    assert_eq!(prob.output_shape, "(1, 4)");
}

#[test]
fn test_softmax_scores_match_hand_computation() {
    // same network truncated before the accuracy layer
    let manifest = NetworkManifest::from_json(&classifier_manifest("sequential", "off")).unwrap();
    let mut def = NetworkDef::resolve(&manifest).unwrap();
    def.layers.pop();
    let mut pipeline = NetworkPipeline::build(
        &def,
        classifier_params(),
        Arc::new(MemoryTuningStore::new()),
        Arc::new(CpuVectorBackend::new()),
    )
    .unwrap();

    let out = pipeline
        .forward(all_ones_input())
        .unwrap()
        .into_rank2()
        .unwrap();
    assert_eq!(out.dims(), (1, 4));
    for (got, want) in out.row(0).iter().zip(EXPECTED_PROBS) {
        assert!((got - want).abs() < 1e-4, "{got} vs {want}");
    }
}

#[test]
fn test_sequential_and_parallel_agree_on_random_weights() {
    let store = MemoryParamStore::new();
    store.insert_conv(
        "conv1.params",
        ConvParams {
            weights: Tensor4::from_vec(
                4,
                3,
                3,
                3,
                (0..108).map(|v| ((v % 11) as f32 - 5.0) * 0.07).collect(),
            )
            .unwrap(),
            bias: vec![0.05, -0.05, 0.1, -0.1],
        },
    );
    store.insert_labels("labels.params", vec![0]);
    let store = Arc::new(store);

    let input = Tensor4::from_vec(
        1,
        3,
        8,
        8,
        (0..192).map(|v| ((v % 13) as f32 - 6.0) * 0.15).collect(),
    )
    .unwrap();

    let manifest = NetworkManifest::from_json(&classifier_manifest("sequential", "off")).unwrap();
    let mut def = NetworkDef::resolve(&manifest).unwrap();
    def.layers.pop(); // compare the probability rows, not the scalar

    let mut seq = NetworkPipeline::build(
        &def,
        store.clone(),
        Arc::new(MemoryTuningStore::new()),
        Arc::new(CpuVectorBackend::new()),
    )
    .unwrap();

    let mut def_par = def.clone();
    def_par.execution_mode = model_ir::ExecutionMode::Parallel;
    let mut par = NetworkPipeline::build(
        &def_par,
        store,
        Arc::new(MemoryTuningStore::new()),
        Arc::new(CpuVectorBackend::new()),
    )
    .unwrap();

    let a = seq
        .forward(Blob::Rank4(input.clone()))
        .unwrap()
        .into_rank2()
        .unwrap();
    let b = par
        .forward(Blob::Rank4(input))
        .unwrap()
        .into_rank2()
        .unwrap();
    for (x, y) in a.data().iter().zip(b.data()) {
        assert!((x - y).abs() < 1e-5, "{x} vs {y}");
    }
}

#[test]
fn test_tuning_records_survive_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let params = classifier_params();

    {
        let tuning = Arc::new(FsTuningStore::new(dir.path()));
        let mut pipeline = build("parallel", "on", params.clone(), tuning);
        pipeline.forward(all_ones_input()).unwrap();
    }

    // conv1 persisted a variant, both pooling stages a worker count
    let reopened = FsTuningStore::new(dir.path());
    assert!(reopened.load("conv1").is_some());
    assert!(reopened.load("pool1").is_some());
    assert!(reopened.load("pool2").is_some());

    // a fresh pipeline reuses them and still computes the same result
    let tuning = Arc::new(FsTuningStore::new(dir.path()));
    let mut pipeline = build("parallel", "on", params, tuning);
    run_and_check(&mut pipeline);
}

#[test]
fn test_fully_connected_network_end_to_end() {
    let manifest = NetworkManifest::from_json(
        r#"{
            "name": "fc-net", "execution_mode": "parallel",
            "auto_tuning": "off", "allocated_ram_mb": 8,
            "layers": [
                { "name": "fc1", "type": "FullyConnected",
                  "parameters_file": "fc1.params" },
                { "name": "relu1", "type": "ReLU" },
                { "name": "prob", "type": "Softmax" }
            ]
        }"#,
    )
    .unwrap();
    let def = NetworkDef::resolve(&manifest).unwrap();

    let store = MemoryParamStore::new();
    // identity-ish weights: neuron j echoes feature j
    let mut weights = vec![0.0f32; 3 * 6];
    for j in 0..3 {
        weights[j * 6 + j] = 1.0;
    }
    store.insert_fc(
        "fc1.params",
        FcParams {
            weights,
            bias: vec![0.0; 3],
        },
    );

    let mut pipeline = NetworkPipeline::build(
        &def,
        Arc::new(store),
        Arc::new(MemoryTuningStore::new()),
        Arc::new(CpuVectorBackend::new()),
    )
    .unwrap();

    let input = Tensor4::from_vec(1, 6, 1, 1, vec![2.0, 1.0, -3.0, 0.0, 0.0, 0.0]).unwrap();
    let out = pipeline
        .forward(Blob::Rank4(input))
        .unwrap()
        .into_rank2()
        .unwrap();
    // relu clamps the -3 echo to 0 before the softmax
    assert_eq!(out.dims(), (1, 3));
    assert!(out.row(0)[0] > out.row(0)[1]);
    assert!((out.row(0)[1] / out.row(0)[2] - 2.71828f32.powf(1.0)).abs() < 1e-3);
}

#[test]
fn test_bad_manifest_is_model_error() {
    let manifest = NetworkManifest::from_json(
        r#"{
            "name": "broken", "execution_mode": "parallel",
            "auto_tuning": "off", "allocated_ram_mb": 8,
            "layers": [
                { "name": "conv1", "type": "Convolution",
                  "parameters_file": "conv1.params", "pad": 1, "group": 1 }
            ]
        }"#,
    )
    .unwrap();
    let err = NetworkDef::resolve(&manifest).unwrap_err();
    assert!(matches!(err, model_ir::ModelError::MissingField { .. }));
}

#[test]
fn test_wrong_input_rank_fails_cleanly() {
    let mut pipeline = build(
        "sequential",
        "off",
        classifier_params(),
        Arc::new(MemoryTuningStore::new()),
    );
    let err = pipeline.forward(Blob::Scalar(1.0)).unwrap_err();
    assert!(matches!(err, RuntimeError::UnsupportedInputShape { .. }));
}
