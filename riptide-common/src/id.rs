// Copyright 2026 The Riptide Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Fixed-size identifier types.
//!
//! Every entity in the runtime is addressed by a fixed-size binary ID:
//! jobs, tasks, objects, actors, cluster nodes, and workers. IDs are
//! plain byte arrays with structural equality; the nil ID (all 0xFF) is
//! the "absent" sentinel.

use std::fmt;

/// Generates a fixed-size riptide ID type.
///
/// Each ID is a `[u8; N]` newtype with:
/// - `from_binary` / `from_hex` / `from_random` constructors
/// - `binary()` / `hex()` / `as_bytes()` accessors
/// - `Hash`, `Eq`, `Ord`, `Clone`, `Copy`, `Debug`, `Display`
/// - a nil default (all 0xFF bytes)
macro_rules! define_id {
    ($name:ident, $size:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            data: [u8; $size],
        }

        impl $name {
            /// The fixed byte size of this ID type.
            pub const SIZE: usize = $size;

            /// Create a nil ID (all 0xFF bytes).
            pub const fn nil() -> Self {
                Self {
                    data: [0xFF; $size],
                }
            }

            /// Create an ID from raw bytes. Panics if `bytes.len() != SIZE`.
            pub fn from_binary(bytes: &[u8]) -> Self {
                assert_eq!(
                    bytes.len(),
                    $size,
                    "expected {} bytes for {}, got {}",
                    $size,
                    stringify!($name),
                    bytes.len()
                );
                let mut data = [0u8; $size];
                data.copy_from_slice(bytes);
                Self { data }
            }

            /// Create an ID from a hex string. Returns the nil ID on invalid input.
            pub fn from_hex(hex_str: &str) -> Self {
                if hex_str.len() != $size * 2 {
                    tracing::error!(
                        "incorrect hex string length for {}: expected {}, got {}",
                        stringify!($name),
                        $size * 2,
                        hex_str.len()
                    );
                    return Self::nil();
                }
                match hex::decode(hex_str) {
                    Ok(bytes) => Self::from_binary(&bytes),
                    Err(_) => {
                        tracing::error!("invalid hex string for {}", stringify!($name));
                        Self::nil()
                    }
                }
            }

            /// Create a random ID.
            pub fn from_random() -> Self {
                let mut data = [0u8; $size];
                riptide_util::random::fill_random(&mut data);
                Self { data }
            }

            /// Returns true if this is the nil ID (all 0xFF).
            pub fn is_nil(&self) -> bool {
                self.data == [0xFF; $size]
            }

            /// Raw byte slice as `&[u8]`.
            pub fn as_bytes(&self) -> &[u8] {
                &self.data
            }

            /// Binary string (owned copy of the bytes).
            pub fn binary(&self) -> Vec<u8> {
                self.data.to_vec()
            }

            /// Hex-encoded string (lowercase).
            pub fn hex(&self) -> String {
                hex::encode(self.data)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.data
            }
        }
    };
}

// JobID: 4 bytes
define_id!(JobID, 4);

// TaskID: 16 bytes
define_id!(TaskID, 16);

// ObjectID: 20 bytes (16-byte task + 4-byte return index)
define_id!(ObjectID, 20);

// ActorID: 16 bytes
define_id!(ActorID, 16);

// NodeID / WorkerID: 16 bytes
define_id!(NodeID, 16);
define_id!(WorkerID, 16);

impl JobID {
    /// Create a JobID from a u32 integer.
    pub fn from_int(value: u32) -> Self {
        Self {
            data: value.to_be_bytes(),
        }
    }

    /// Convert to a u32 integer.
    pub fn to_int(&self) -> u32 {
        u32::from_be_bytes(self.data)
    }
}

impl ObjectID {
    const INDEX_BYTES_LENGTH: usize = 4;

    /// Create an ObjectID from a TaskID and a return-value index.
    pub fn from_index(task_id: &TaskID, index: u32) -> Self {
        let mut data = [0u8; Self::SIZE];
        data[..TaskID::SIZE].copy_from_slice(task_id.as_bytes());
        data[TaskID::SIZE..].copy_from_slice(&index.to_be_bytes());
        Self { data }
    }

    /// Extract the embedded TaskID (first 16 bytes).
    pub fn task_id(&self) -> TaskID {
        TaskID::from_binary(&self.data[..TaskID::SIZE])
    }

    /// Get the return-value index (last 4 bytes as big-endian u32).
    pub fn object_index(&self) -> u32 {
        u32::from_be_bytes(
            self.data[Self::SIZE - Self::INDEX_BYTES_LENGTH..]
                .try_into()
                .unwrap(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_and_default() {
        assert!(TaskID::nil().is_nil());
        assert_eq!(TaskID::default(), TaskID::nil());
        assert!(!TaskID::from_random().is_nil());
    }

    #[test]
    fn test_binary_roundtrip() {
        let id = WorkerID::from_random();
        let copy = WorkerID::from_binary(&id.binary());
        assert_eq!(id, copy);
    }

    #[test]
    fn test_hex_roundtrip() {
        let id = NodeID::from_random();
        let copy = NodeID::from_hex(&id.hex());
        assert_eq!(id, copy);
    }

    #[test]
    fn test_from_hex_invalid_is_nil() {
        assert!(NodeID::from_hex("zz").is_nil());
        assert!(NodeID::from_hex(&"g".repeat(NodeID::SIZE * 2)).is_nil());
    }

    #[test]
    fn test_job_id_int_roundtrip() {
        let job = JobID::from_int(7);
        assert_eq!(job.to_int(), 7);
    }

    #[test]
    fn test_object_id_embeds_task_and_index() {
        let task = TaskID::from_random();
        let oid = ObjectID::from_index(&task, 3);
        assert_eq!(oid.task_id(), task);
        assert_eq!(oid.object_index(), 3);
    }

    #[test]
    fn test_distinct_random_ids() {
        assert_ne!(TaskID::from_random(), TaskID::from_random());
    }
}
