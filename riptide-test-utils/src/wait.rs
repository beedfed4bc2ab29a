// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async-aware wait utilities for tests.

use std::time::Duration;

/// Poll a synchronous condition every millisecond until it returns true or
/// the timeout expires.
///
/// Returns `true` if the condition was met, `false` on timeout.
pub async fn wait_for_condition<F>(condition: F, timeout_ms: u64) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_immediate_true() {
        assert!(wait_for_condition(|| true, 1000).await);
    }

    #[tokio::test]
    async fn test_timeout_false() {
        assert!(!wait_for_condition(|| false, 20).await);
    }

    #[tokio::test]
    async fn test_eventual_true() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            flag_clone.store(true, Ordering::SeqCst);
        });
        assert!(wait_for_condition(|| flag.load(Ordering::SeqCst), 1000).await);
    }
}
