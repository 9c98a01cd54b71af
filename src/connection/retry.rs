//! Retrying session setup.

use std::thread;

use tracing::debug;

use crate::{FileError, Realm, RetryPolicy};

/// Errors that another attempt cannot fix.
fn is_permanent(error: &FileError) -> bool {
    matches!(
        error,
        FileError::AuthenticationRequired { .. }
            | FileError::AccessDenied { .. }
            | FileError::Unsupported { .. }
            | FileError::InvalidLocation { .. }
    )
}

/// Run `attempt` until it succeeds, fails permanently, or the policy runs
/// out of attempts. The last error is returned.
pub fn retry_with_policy<T>(
    policy: &RetryPolicy,
    realm: &Realm,
    mut attempt: impl FnMut(u32) -> Result<T, FileError>,
) -> Result<T, FileError> {
    let attempts = policy.max_attempts.max(1);
    let mut n = 0;
    loop {
        match attempt(n) {
            Ok(value) => return Ok(value),
            Err(error) if is_permanent(&error) => return Err(error),
            Err(error) => {
                n += 1;
                if n >= attempts {
                    return Err(error);
                }
                let delay = policy.delay_for(n);
                debug!(%realm, attempt = n, ?delay, %error, "connect failed, retrying");
                thread::sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Location;
    use std::time::Duration;

    fn realm() -> Realm {
        Location::parse("virt://host").unwrap().realm()
    }

    fn transient() -> FileError {
        FileError::protocol("connect", "virt://host", "reset")
    }

    #[test]
    fn retries_transient_failures() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1), Duration::from_millis(2));
        let mut calls = 0;
        let result = retry_with_policy(&policy, &realm(), |_| {
            calls += 1;
            if calls < 3 { Err(transient()) } else { Ok(calls) }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::exponential(2, Duration::from_millis(1), Duration::from_millis(1));
        let mut calls = 0;
        let result: Result<(), _> = retry_with_policy(&policy, &realm(), |_| {
            calls += 1;
            Err(transient())
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[test]
    fn auth_failure_is_not_retried() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(1), Duration::from_millis(1));
        let mut calls = 0;
        let result: Result<(), _> = retry_with_policy(&policy, &realm(), |_| {
            calls += 1;
            Err(FileError::AuthenticationRequired { realm: realm() })
        });
        assert!(result.unwrap_err().is_user_recoverable());
        assert_eq!(calls, 1);
    }
}
