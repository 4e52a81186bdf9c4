#[cfg(test)]
mod tests {
    use crate::keyed_mutex::KeyedMutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Barrier, oneshot};

    #[tokio::test]
    async fn test_entry_created_on_lock_and_evicted_on_release() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();
        assert!(locks.is_empty());

        let guard = locks.lock("p1").await;
        assert_eq!(guard.key(), &"p1");
        assert!(locks.contains(&"p1"));
        assert_eq!(locks.refcount(&"p1"), 1);

        drop(guard);
        assert!(locks.is_empty());
        assert_eq!(locks.refcount(&"p1"), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block_each_other() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();

        let a = locks.lock("a").await;
        // Would hang if "b" shared "a"'s lock.
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock("b"))
            .await
            .expect("distinct key must not wait");

        assert_eq!(locks.len(), 2);
        drop(a);
        drop(b);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_try_lock_on_held_key_leaves_no_residue() {
        let locks: KeyedMutex<u32> = KeyedMutex::new();

        let held = locks.lock(7).await;
        assert!(locks.try_lock(7).is_none());
        assert_eq!(locks.refcount(&7), 1);

        drop(held);
        let again = locks.try_lock(7);
        assert!(again.is_some());
        drop(again);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiter_counts_toward_refcount() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();
        let held = locks.lock("k").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("k").await;
            })
        };

        while locks.refcount(&"k") < 2 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_wait_reverts_refcount() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();
        let held = locks.lock("k").await;

        let result = tokio::time::timeout(Duration::from_millis(20), locks.lock("k")).await;
        assert!(result.is_err());

        // Only the holder remains.
        assert_eq!(locks.refcount(&"k"), 1);
        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_aborted_waiting_task_does_not_leak_entry() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();
        let held = locks.lock("k").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("k").await;
            })
        };
        while locks.refcount(&"k") < 2 {
            tokio::task::yield_now().await;
        }

        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(locks.refcount(&"k"), 1);

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_guard_released_when_holder_panics() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();

        let task = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("k").await;
                panic!("handler failed");
            })
        };
        assert!(task.await.unwrap_err().is_panic());

        assert!(locks.is_empty());
        let _guard = tokio::time::timeout(Duration::from_secs(1), locks.lock("k"))
            .await
            .expect("lock must be free after the holder panicked");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_at_most_one_holder_per_key() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock("shared").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_keys_hold_concurrently() {
        let locks: KeyedMutex<u32> = KeyedMutex::new();
        // Both tasks must be inside their critical sections at once to pass the barrier.
        let barrier = Arc::new(Barrier::new(2));

        let mut tasks = Vec::new();
        for key in [1, 2] {
            let locks = locks.clone();
            let barrier = Arc::clone(&barrier);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock(key).await;
                barrier.wait().await;
            }));
        }

        let all = async {
            for task in tasks {
                task.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("different keys must not serialize");
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_table_guard_not_held_while_waiting() {
        let locks: KeyedMutex<&str> = KeyedMutex::new();
        let held = locks.lock("a").await;
        let (tx, rx) = oneshot::channel();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("a").await;
                let _ = tx.send(());
            })
        };
        while locks.refcount(&"a") < 2 {
            tokio::task::yield_now().await;
        }

        // Table operations and other keys proceed while "a" has a waiter.
        assert_eq!(locks.len(), 1);
        drop(locks.lock("b").await);

        drop(held);
        rx.await.unwrap();
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
