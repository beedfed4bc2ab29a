// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Utility library for riptide.
//!
//! Provides time, randomness, logging setup, and process helpers shared by
//! the other riptide crates.

pub mod logging;
pub mod process;
pub mod random;
pub mod time;
