//! Buffered frame reading and writing over split stream halves.

use super::EngineError;
use crate::codec::{Frame, ProtocolHeader};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 8 * 1024;

pub(super) struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_frame_size: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub(super) fn new(inner: R, max_frame_size: u32) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            max_frame_size,
        }
    }

    /// Reads more bytes into the buffer. Cancel safe: nothing is lost if the
    /// future is dropped.
    async fn fill(&mut self) -> Result<(), EngineError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.inner.read(&mut chunk).await?;
        if n == 0 {
            return Err(EngineError::Eof);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }

    pub(super) async fn read_header(&mut self) -> Result<ProtocolHeader, EngineError> {
        while self.buf.len() < 8 {
            self.fill().await?;
        }
        let mut header = [0u8; 8];
        header.copy_from_slice(&self.buf[..8]);
        self.buf.drain(..8);
        Ok(ProtocolHeader::from_bytes(header)?)
    }

    pub(super) async fn read_frame(&mut self) -> Result<Frame, EngineError> {
        loop {
            if let Some((frame, used)) = Frame::decode(&self.buf, self.max_frame_size)? {
                self.buf.drain(..used);
                return Ok(frame);
            }
            self.fill().await?;
        }
    }
}

pub(super) struct FrameWriter<W> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub(super) fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    pub(super) async fn write_header(&mut self, header: ProtocolHeader) -> Result<(), EngineError> {
        self.inner.write_all(&header.to_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub(super) async fn write_frame(&mut self, frame: &Frame) -> Result<(), EngineError> {
        self.buf.clear();
        frame.encode(&mut self.buf);
        self.inner.write_all(&self.buf).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub(super) async fn shutdown(&mut self) {
        if let Err(e) = self.inner.shutdown().await {
            tracing::debug!("Shutdown after close failed: {}", e);
        }
    }
}
