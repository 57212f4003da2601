use thiserror::Error;

/// Errors from policy validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("records-per-file must be at least 1")]
    ZeroRotationCount,
}

/// How many records a single output file may hold.
///
/// A file never contains more than `records_per_file` records; it may
/// contain fewer only when capture stops or a write failure forces an early
/// rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    records_per_file: u64,
}

impl RotationPolicy {
    pub fn new(records_per_file: u64) -> Result<Self, PolicyError> {
        if records_per_file == 0 {
            return Err(PolicyError::ZeroRotationCount);
        }
        Ok(Self { records_per_file })
    }

    pub fn records_per_file(&self) -> u64 {
        self.records_per_file
    }
}

/// Soft bound on the total size of the output directory.
///
/// The directory may transiently exceed the bound between writes;
/// enforcement runs once per rotation, not per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_dir_bytes: u64,
}

impl RetentionPolicy {
    pub fn from_bytes(max_dir_bytes: u64) -> Self {
        Self { max_dir_bytes }
    }

    pub fn from_megabytes(megabytes: u64) -> Self {
        Self {
            max_dir_bytes: megabytes * 1024 * 1024,
        }
    }

    pub fn max_dir_bytes(&self) -> u64 {
        self.max_dir_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_policy_rejects_zero() {
        assert_eq!(RotationPolicy::new(0), Err(PolicyError::ZeroRotationCount));
    }

    #[test]
    fn rotation_policy_accepts_one() {
        assert_eq!(RotationPolicy::new(1).expect("valid").records_per_file(), 1);
    }

    #[test]
    fn retention_policy_megabyte_conversion() {
        assert_eq!(
            RetentionPolicy::from_megabytes(40).max_dir_bytes(),
            40 * 1024 * 1024
        );
        assert_eq!(RetentionPolicy::from_bytes(1234).max_dir_bytes(), 1234);
    }
}
