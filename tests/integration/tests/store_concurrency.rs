//! Exactly-once artifact consumption under concurrency.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use idp_store::{IdpStore, MemoryStore, StoreError};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_of_many_concurrent_takes_wins() -> anyhow::Result<()> {
    let store = IdpStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(1));

    for round in 0..10 {
        let handle = format!("handle-{round}");
        store
            .put_artifact(&handle, "<samlp:Response/>", Duration::from_secs(60))
            .await?;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let handle = handle.clone();
                tokio::spawn(async move { store.take_artifact(&handle).await })
            })
            .collect();

        let mut winners = 0;
        for outcome in join_all(tasks).await {
            match outcome? {
                Ok(message) => {
                    assert_eq!(message, "<samlp:Response/>");
                    winners += 1;
                }
                Err(StoreError::NotFound) => {}
                Err(e) => anyhow::bail!("unexpected store error: {e}"),
            }
        }
        assert_eq!(winners, 1, "round {round}");
    }
    Ok(())
}
