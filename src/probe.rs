/// Probe a buffer and return whether it looks like a JPEG image.
///
/// A file is a JPEG iff its first three bytes are `0xFF 0xD8 0xFF`, the
/// SOI marker followed by the first byte of the next marker.
#[must_use]
pub fn is_jpeg(buffer: &[u8]) -> bool
{
    buffer.len() >= 3 && buffer[..3] == [0xFF, 0xD8, 0xFF]
}

#[cfg(test)]
mod tests
{
    use super::is_jpeg;

    #[test]
    fn jpeg_signature_is_recognized()
    {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
    }

    #[test]
    fn png_signature_is_rejected()
    {
        assert!(!is_jpeg(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]));
        assert!(!is_jpeg(&[0xFF, 0xD8]));
        assert!(!is_jpeg(&[]));
    }
}
