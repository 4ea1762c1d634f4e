//! Error types for the mcrc-core crate.

/// Errors from packet stream operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The stream lacks room for the packet plus its length prefix. The
    /// stream's contents and cursors are left untouched; the caller decides
    /// whether to drop, wait, or escalate.
    #[error("stream buffer full: need {needed} bytes, {free} free")]
    BufferFull { needed: usize, free: usize },
    /// The payload exceeds the 16-bit length limit.
    #[error("packet too large: {len} bytes exceeds the {max}-byte limit")]
    PacketTooLarge { len: usize, max: usize },
}

/// Errors from wire framing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// The payload cannot be described by the 16-bit wire length.
    #[error("payload too long for wire framing: {len} bytes exceeds {max}")]
    PayloadTooLong { len: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let full = StreamError::BufferFull { needed: 10, free: 4 };
        assert!(full.to_string().contains("need 10 bytes"));
        assert!(full.to_string().contains("4 free"));

        let large = StreamError::PacketTooLarge {
            len: 70_000,
            max: 65_535,
        };
        assert!(large.to_string().contains("70000"));

        let long = FramingError::PayloadTooLong {
            len: 70_000,
            max: 65_535,
        };
        assert!(long.to_string().contains("too long"));
    }
}
