//! Dependency simulator tests against the real metrics registry

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use pingpong::decider::{FixedSource, SeededSource};
use pingpong::simulator::{DependencySimulator, SimulatorOpts, CONTEXT_CANCELLED};
use pingpong::telemetry::{
    DbMetrics, MetricsRegistry, DB_INFLIGHT_QUERIES, DB_QUERIES_TOTAL, DB_QUERY_DURATION,
    DB_QUERY_ERRORS,
};

fn simulator(opts: SimulatorOpts, seed: u64) -> (DependencySimulator, Arc<MetricsRegistry>) {
    let registry = Arc::new(MetricsRegistry::new());
    let metrics = DbMetrics::new(registry.clone(), None);
    let simulator = DependencySimulator::with_source(
        Arc::new(metrics),
        &opts,
        Arc::new(SeededSource::with_seed(seed)),
    )
    .unwrap();
    (simulator, registry)
}

#[tokio::test(start_paused = true)]
async fn test_mixed_outcomes_are_all_recorded() {
    let (simulator, registry) = simulator(
        SimulatorOpts {
            latency: "50%10ms,50%40ms".to_string(),
            success_prob: 60.0,
            error_types: "50%timeout,50%deadlock".to_string(),
        },
        7,
    );
    let cancel = CancellationToken::new();

    let mut failures = 0;
    for _ in 0..200 {
        let result = simulator.simulate_update(&cancel, "orders").await;
        if !result.success {
            failures += 1;
            let error_type = result.error_type.as_deref().unwrap();
            assert!(error_type == "timeout" || error_type == "deadlock");
            assert_eq!(result.rows_affected, 0);
        } else {
            assert!((1..=100).contains(&result.rows_affected));
        }
        assert!(result.duration >= Duration::from_millis(10));
    }

    let ok = registry.counter_value(
        DB_QUERIES_TOTAL,
        &[("operation", "update"), ("table", "orders"), ("status", "success")],
    );
    let errors = registry.counter_value(
        DB_QUERIES_TOTAL,
        &[("operation", "update"), ("table", "orders"), ("status", "error")],
    );
    assert_eq!(ok + errors, 200);
    assert_eq!(errors, failures);

    let by_type: u64 = ["timeout", "deadlock"]
        .iter()
        .map(|t| {
            registry.counter_value(
                DB_QUERY_ERRORS,
                &[("operation", "update"), ("table", "orders"), ("error_type", t)],
            )
        })
        .sum();
    assert_eq!(by_type, failures);

    let snapshot = registry
        .histogram_snapshot(
            DB_QUERY_DURATION,
            &[("operation", "update"), ("table", "orders"), ("status", "success")],
        )
        .unwrap();
    assert_eq!(snapshot.count, ok);
    assert_eq!(
        registry.gauge_value(DB_INFLIGHT_QUERIES, &[("operation", "update"), ("table", "orders")]),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_wait_is_recorded_as_error() {
    let registry = Arc::new(MetricsRegistry::new());
    let simulator = DependencySimulator::with_source(
        Arc::new(DbMetrics::new(registry.clone(), None)),
        &SimulatorOpts {
            latency: "100%10s".to_string(),
            success_prob: 100.0,
            error_types: String::new(),
        },
        Arc::new(FixedSource(1.0)),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let result = simulator.simulate_insert(&cancel, "events").await;
    assert!(result.is_cancelled());
    assert!(result.duration < Duration::from_secs(10));

    assert_eq!(
        registry.counter_value(
            DB_QUERY_ERRORS,
            &[("operation", "insert"), ("table", "events"), ("error_type", CONTEXT_CANCELLED)]
        ),
        1
    );
    assert_eq!(
        registry.counter_value(
            DB_QUERIES_TOTAL,
            &[("operation", "insert"), ("table", "events"), ("status", "error")]
        ),
        1
    );
}

#[tokio::test]
async fn test_default_error_types_when_empty() {
    let (simulator, _) = simulator(
        SimulatorOpts {
            latency: "100%0s".to_string(),
            success_prob: 0.0,
            error_types: String::new(),
        },
        3,
    );

    let result = simulator
        .simulate_delete(&CancellationToken::new(), "sessions")
        .await;
    assert_eq!(result.error_type.as_deref(), Some("generic"));
}

#[test]
fn test_invalid_options_are_rejected() {
    let registry = Arc::new(MetricsRegistry::new());
    let metrics = Arc::new(DbMetrics::new(registry, None));

    let bad = [
        SimulatorOpts {
            latency: "90%10ms".to_string(),
            ..Default::default()
        },
        SimulatorOpts {
            error_types: "100timeout".to_string(),
            ..Default::default()
        },
        SimulatorOpts {
            success_prob: 101.0,
            ..Default::default()
        },
    ];

    for opts in bad {
        assert!(DependencySimulator::new(metrics.clone(), &opts).is_err(), "{:?}", opts);
    }
}
