//! Black-box tests for the pool's testable properties (spec §8: "Rotation
//! fairness", "Invalidation stickiness"), exercised through the public API
//! only — mirroring the teacher's `gproxy-provider-core/tests/credential_pool.rs`
//! convention of keeping the one component subtle enough to need
//! integration-level testing in its own file, separate from the unit tests
//! alongside the rest of the crate's source.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use ccgw_common::GatewayConfigPatch;
use ccgw_credential::{CredentialPool, CredentialRecord, ManagedCredential};

fn config() -> ccgw_common::GatewayConfig {
    GatewayConfigPatch::default().into_config().unwrap()
}

fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

fn valid_credential(id: usize) -> ManagedCredential {
    ManagedCredential::from_record(
        id,
        CredentialRecord {
            refresh_token: format!("rt-{id}"),
            access_token: Some(format!("at-{id}")),
            expires_at: Some(now() + 10_000),
            project_id: Some(format!("proj-{id}")),
            user_email: None,
            client_id: None,
            client_secret: None,
        },
    )
    .unwrap()
}

/// "for any pool of size N where all credentials are valid, any N
/// consecutive `next()` calls return N distinct credentials."
#[tokio::test]
async fn rotation_fairness_holds_for_n_consecutive_calls() {
    const N: usize = 5;
    let credentials: Vec<_> = (0..N).map(valid_credential).collect();
    let pool = CredentialPool::new(credentials, wreq::Client::new(), &config());

    let mut seen = HashSet::new();
    for _ in 0..N {
        let credential = pool.next().await.expect("pool is non-empty and every entry is valid");
        seen.insert(credential.id);
    }
    assert_eq!(seen.len(), N, "expected {N} distinct credentials across {N} consecutive next() calls");

    // A second full lap should revisit the same set, not starve any entry.
    let mut seen_again = HashSet::new();
    for _ in 0..N {
        let credential = pool.next().await.unwrap();
        seen_again.insert(credential.id);
    }
    assert_eq!(seen, seen_again);
}

/// "after `next()` observes a permanent refresh failure for credential C,
/// no subsequent `next()` in the process returns C." Simulated here by
/// constructing the pool with one entry already marked invalid, since
/// driving an actual permanent-refresh-failure requires a live token
/// endpoint; `pool.rs`'s unit tests cover the transition itself.
#[tokio::test]
async fn invalidated_credential_is_never_returned_again() {
    let mut dead = valid_credential(0);
    dead.is_valid = false;
    let alive = valid_credential(1);
    let pool = CredentialPool::new(vec![dead, alive], wreq::Client::new(), &config());

    for _ in 0..10 {
        let credential = pool.next().await.expect("one valid credential remains");
        assert_eq!(credential.id, 1, "the invalidated credential must never be returned");
    }
}

/// A pool with every entry invalid reports `NoCredentialsAvailable` rather
/// than looping forever or panicking.
#[tokio::test]
async fn pool_with_only_invalid_entries_reports_no_credentials_available() {
    let mut dead = valid_credential(0);
    dead.is_valid = false;
    let pool = CredentialPool::new(vec![dead], wreq::Client::new(), &config());

    assert!(pool.next().await.is_err());
}
