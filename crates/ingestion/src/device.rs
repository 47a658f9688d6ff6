//! Blocking byte device read on its own thread
//!
//! Serial devices, FIFOs and stdin only offer blocking reads. The read loop
//! runs on a plain thread that is never joined, so runtime shutdown does not
//! wait on a silent device. The async side sees an `AsyncRead` fed through a
//! small channel.

use std::io::{self, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Chunks buffered between the reader thread and the ingestor
const CHUNK_QUEUE: usize = 16;

/// `AsyncRead` over a blocking reader running on a detached thread
///
/// End of stream on the device, or the thread exiting, reads as EOF. A read
/// error is delivered once, then EOF.
#[derive(Debug)]
pub struct DeviceReader {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    pending: Bytes,
}

impl DeviceReader {
    /// Start the reader thread
    pub fn spawn<R>(reader: R, chunk_bytes: usize) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHUNK_QUEUE);
        let chunk_bytes = chunk_bytes.max(1);

        std::thread::Builder::new()
            .name("device-reader".into())
            .spawn(move || read_device(reader, tx, chunk_bytes))?;

        Ok(Self {
            rx,
            pending: Bytes::new(),
        })
    }
}

fn read_device<R: Read>(mut reader: R, tx: mpsc::Sender<io::Result<Bytes>>, chunk_bytes: usize) {
    let mut buf = vec![0u8; chunk_bytes];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("device reached end of stream");
                return;
            }
            Ok(n) => {
                if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                    // ingestor gone
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "device read failed");
                let _ = tx.blocking_send(Err(e));
                return;
            }
        }
    }
}

impl AsyncRead for DeviceReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            if !self.pending.is_empty() {
                let n = self.pending.len().min(buf.remaining());
                let chunk = self.pending.split_to(n);
                buf.put_slice(&chunk);
                return Poll::Ready(Ok(()));
            }

            match ready!(self.rx.poll_recv(cx)) {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(e)) => return Poll::Ready(Err(e)),
                None => return Poll::Ready(Ok(())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc as std_mpsc, Arc};
    use std::time::Duration;

    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::{BoundedChannel, IngestEnd, Ingestor, IngestorConfig};

    /// Blocks in `read` until the gate sender is dropped
    struct SilentDevice(std_mpsc::Receiver<()>);

    impl Read for SilentDevice {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    struct Unplugged;

    impl Read for Unplugged {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
        }
    }

    #[tokio::test]
    async fn test_reads_through_to_end_of_stream() {
        let data = b"{\"spo2\":97}\n{\"spo2\":96}\n".to_vec();
        let mut device = DeviceReader::spawn(io::Cursor::new(data.clone()), 5).unwrap();

        let mut out = Vec::new();
        device.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn test_read_error_surfaces_once() {
        let mut device = DeviceReader::spawn(Unplugged, 64).unwrap();
        let mut buf = [0u8; 8];

        let err = device.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(device.read(&mut buf).await.unwrap(), 0);
    }

    #[test]
    fn test_silent_device_does_not_hold_runtime_on_stop() {
        let (_gate, held) = std_mpsc::channel::<()>();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let end = runtime.block_on({
            let stop = stop.clone();
            async move {
                let device = DeviceReader::spawn(SilentDevice(held), 64).unwrap();
                let config = IngestorConfig {
                    read_timeout: Duration::from_millis(50),
                    ..Default::default()
                };
                let ingestor = Ingestor::new(device, BoundedChannel::new(4), stop.clone(), config);
                let task = tokio::spawn(ingestor.run());

                tokio::time::sleep(Duration::from_millis(200)).await;
                stop.store(true, Ordering::Release);
                task.await.unwrap().unwrap()
            }
        });
        assert_eq!(end, IngestEnd::Stopped);

        // the device thread is still blocked in read; dropping the runtime must not wait on it
        let (done_tx, done_rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            drop(runtime);
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
