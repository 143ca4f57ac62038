//! Argument checks shared by the domain clients.
//!
//! Messages are stable and surface verbatim as
//! [`SmartObjectsError::Validation`](crate::SmartObjectsError::Validation).

use crate::{Result, SmartObjectsError};

/// Largest batch accepted by the API.
pub const MAX_BATCH_SIZE: usize = 1000;

pub(crate) fn not_blank(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SmartObjectsError::validation(message));
    }
    Ok(())
}

pub(crate) fn batch_size<T>(items: &[T], message: &str) -> Result<()> {
    if items.is_empty() || items.len() > MAX_BATCH_SIZE {
        return Err(SmartObjectsError::validation(message));
    }
    Ok(())
}

pub(crate) fn not_empty<T>(items: &[T], message: &str) -> Result<()> {
    if items.is_empty() {
        return Err(SmartObjectsError::validation(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{batch_size, not_blank, MAX_BATCH_SIZE};
    use crate::SmartObjectsError;

    #[test]
    fn blank_values_are_rejected() {
        assert!(not_blank("alice", "username cannot be blank.").is_ok());
        for blank in ["", "   ", "\t"] {
            match not_blank(blank, "username cannot be blank.") {
                Err(SmartObjectsError::Validation(message)) => {
                    assert_eq!(message, "username cannot be blank.")
                }
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn batch_bounds_are_inclusive() {
        let message = "Owner body list cannot be empty or biger that 1000.";
        assert!(batch_size(&[0u8; 1], message).is_ok());
        assert!(batch_size(&vec![0u8; MAX_BATCH_SIZE], message).is_ok());
        assert!(batch_size::<u8>(&[], message).is_err());

        let err = batch_size(&vec![0u8; MAX_BATCH_SIZE + 1], message).expect_err("must fail");
        assert_eq!(err.to_string(), message);
    }
}
