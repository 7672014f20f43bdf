//! Architectural Contract Test: Client Pool Discipline
//!
//! This test verifies that every client checked out by an attempt goes back
//! to the pool, whichever way the attempt ends.
//!
//! Constraints verified:
//! - Success, failure and transport errors all return their clients
//! - Concurrent attempts reuse idle clients instead of building new ones each time
//! - The idle list never grows past `max_idle_clients`
//!
//! If this test fails, someone has:
//! - Held a client across the resolve/update boundary
//! - Leaked a client on an early return

mod common;

use common::*;
use ddns_core::config::OrchestratorConfig;
use ddns_core::proxy::ProxyList;
use ddns_core::status::State;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn clients_return_after_each_outcome() {
    let scripts = [
        Script::new(|call| {
            if call.is_resolve() {
                found(1)
            } else {
                updated("203.0.113.7")
            }
        }),
        Script::new(|call| {
            if call.is_resolve() {
                found(1)
            } else {
                rejected("-1")
            }
        }),
        Script::new(|_| Reply::Fail),
        Script::new(|_| Reply::Body("not json".to_string())),
    ];

    for script in scripts {
        let harness = Harness::direct(script);
        let mut params = params();

        let _ = harness.orchestrator.execute(&mut params).await;

        assert_eq!(harness.clients.outstanding(), 0);
        assert!(harness.clients.idle() >= 1);
    }
}

#[tokio::test]
async fn one_client_serves_both_phases_sequentially() {
    let script = Script::new(|call| {
        if call.is_resolve() {
            found(1)
        } else {
            updated("203.0.113.7")
        }
    });
    let harness = Harness::direct(script);

    for _ in 0..3 {
        let mut params = params();
        let outcome = harness.orchestrator.execute(&mut params).await;
        assert_eq!(outcome.status.state, State::Success);
    }

    assert_eq!(harness.clients.created(), 1, "idle client reused across phases");
    assert_eq!(harness.clients.outstanding(), 0);
}

#[tokio::test]
async fn concurrent_attempts_bound_the_idle_list() {
    let script = Script::new(|call| {
        let reply = if call.is_resolve() {
            r#"{"code":"1","message":"ok","at":"2024-05-01 10:00:00","id":"3"}"#
        } else {
            r#"{"code":"1","message":"ok","at":"2024-05-01 10:00:01","value":"203.0.113.7"}"#
        };
        Reply::Delayed(Duration::from_millis(20), reply.to_string())
    });
    let config = OrchestratorConfig {
        max_idle_clients: 2,
        worker_pool_size: 8,
        ..OrchestratorConfig::default()
    };
    let Harness {
        orchestrator,
        clients,
        ..
    } = Harness::build(script, config, ProxyList::default());
    let orchestrator = Arc::new(orchestrator);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                let mut params =
                    ddns_core::Parameters::new("example.com", format!("h{i}"), "203.0.113.7");
                orchestrator.execute(&mut params).await.status.state
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), State::Success);
    }

    assert_eq!(clients.outstanding(), 0);
    assert!(clients.idle() <= 2, "idle list grew to {}", clients.idle());
}
