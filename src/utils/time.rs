use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock in milliseconds, truncated to the 32-bit RTMP timestamp space
pub fn current_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_nonzero() {
        assert_ne!(current_timestamp(), 0);
    }
}
