use super::ProtocolError;

/// Big-endian writer for a frame whose exact length is known up front.
#[derive(Debug)]
pub struct ByteWriter {
    buf: Vec<u8>,
    expected: usize,
}

impl ByteWriter {
    pub fn with_size(expected: usize) -> Self {
        Self {
            buf: Vec::with_capacity(expected),
            expected,
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn finish(self) -> Result<Vec<u8>, ProtocolError> {
        if self.buf.len() != self.expected {
            return Err(ProtocolError::SizeMismatch {
                expected: self.expected,
                actual: self.buf.len(),
            });
        }
        Ok(self.buf)
    }
}

#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, index: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let end = self.index + N;
        let bytes = self
            .data
            .get(self.index..end)
            .ok_or(ProtocolError::Truncated {
                needed: end,
                available: self.data.len(),
            })?;
        self.index = end;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        self.take().map(u16::from_be_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.take().map(u32::from_be_bytes)
    }

    pub fn f32(&mut self) -> Result<f32, ProtocolError> {
        self.take().map(f32::from_be_bytes)
    }

    /// Fails unless every byte of the frame was consumed.
    pub fn finish(self) -> Result<(), ProtocolError> {
        if self.index != self.data.len() {
            return Err(ProtocolError::SizeMismatch {
                expected: self.index,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}
