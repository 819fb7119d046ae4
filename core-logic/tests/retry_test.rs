use core_logic::{is_transient_error, with_retry, RetryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("success".to_string())
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_success_after_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count < 3 {
            Err(anyhow::anyhow!("temporary error"))
        } else {
            Ok("success".to_string())
        }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_all_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("permanent error"))
    })
    .await;

    assert!(result.is_err());
    // First attempt plus three retries
    assert_eq!(counter.load(Ordering::SeqCst), 4);
    let msg = format!("{:#}", result.unwrap_err());
    assert!(msg.contains("test_op failed after 4 attempts"));
}

#[tokio::test]
async fn test_transient_only_gives_up_on_permanent_errors() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(5, 10).without_jitter().transient_only();

    let result: Result<(), anyhow::Error> = with_retry(config, "add_match", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("execution reverted: only owner"))
    })
    .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_backoff_waits() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(2, 50).without_jitter();

    let start = tokio::time::Instant::now();
    let _: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        if counter.load(Ordering::SeqCst) < 3 {
            Err(anyhow::anyhow!("temp"))
        } else {
            Ok("done".to_string())
        }
    })
    .await;

    let elapsed = start.elapsed();
    // 50ms + 100ms
    assert!(elapsed >= Duration::from_millis(150));
}

#[test]
fn test_transient_error_detection() {
    let timeout_error = anyhow::anyhow!("Request timeout");
    let rate_limit_error = anyhow::anyhow!("429 Too Many Requests");
    let nonce_error = anyhow::anyhow!("nonce too low");
    let permanent_error = anyhow::anyhow!("Invalid address");

    assert!(is_transient_error(&timeout_error));
    assert!(is_transient_error(&rate_limit_error));
    assert!(is_transient_error(&nonce_error));
    assert!(!is_transient_error(&permanent_error));
}

#[test]
fn test_transient_error_case_insensitive() {
    let timeout_upper = anyhow::anyhow!("TIMEOUT");
    let timeout_mixed = anyhow::anyhow!("TiMeOuT");

    assert!(is_transient_error(&timeout_upper));
    assert!(is_transient_error(&timeout_mixed));
}
