// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Time utilities.

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current time in milliseconds since the Unix epoch.
///
/// Lease expiration deadlines are expressed on this clock.
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_time_ms_monotonic_enough() {
        let t1 = current_time_ms();
        let t2 = current_time_ms();
        assert!(t2 >= t1);
        // Sanity check: should be after year 2020
        assert!(t1 > 1_577_836_800_000);
    }
}
