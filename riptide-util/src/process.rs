// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Process management utilities.

/// Terminate the current process immediately, without running destructors
/// or flushing buffers.
///
/// Used when the process has lost its local raylet and cannot make further
/// progress; the caller is expected to have logged the reason already.
pub fn quick_exit() -> ! {
    #[cfg(unix)]
    unsafe {
        libc::_exit(1);
    }
    #[cfg(not(unix))]
    std::process::exit(1);
}

/// Get the current process ID.
pub fn get_pid() -> u32 {
    std::process::id()
}
