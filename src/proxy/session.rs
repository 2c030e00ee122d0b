//! Layer session
//!
//! Drives next-layer resolution for one client connection: bytes are buffered
//! as they arrive and the resolver is asked for layers until it defers or a
//! layer takes over the client stream.

use std::sync::Arc;

use bytes::BytesMut;
use log::{debug, info, trace};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::common::{ProxyError, Result};
use crate::config::FilterPolicy;
use crate::layer::{Context, Layer};
use crate::resolver::{Decision, NextLayerResolver};

const READ_CHUNK_SIZE: usize = 4096;

/// Where a session stands after new bytes were handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The resolver needs more client bytes
    NeedMoreData,
    /// This layer now owns the client byte stream
    Established(Layer),
}

/// Per-connection resolution state
#[derive(Debug)]
pub struct LayerSession {
    context: Context,
    policy: Arc<FilterPolicy>,
    resolver: NextLayerResolver,
    buffer: BytesMut,
    established: Option<Layer>,
}

impl LayerSession {
    /// Create a session; `policy` stays fixed for the session's lifetime
    pub fn new(context: Context, policy: Arc<FilterPolicy>) -> Self {
        Self {
            context,
            policy,
            resolver: NextLayerResolver::new(),
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            established: None,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Layers pushed so far, outermost first
    pub fn layers(&self) -> &[Layer] {
        self.context.layers()
    }

    /// Client bytes buffered for the layer being resolved
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Handle newly received client bytes
    ///
    /// Once a layer has taken over the stream, further bytes belong to it and
    /// are not buffered here.
    pub fn feed(&mut self, data: &[u8]) -> Result<Progress> {
        if let Some(layer) = self.established {
            return Ok(Progress::Established(layer));
        }

        self.buffer.extend_from_slice(data);

        loop {
            match self.resolver.resolve(&self.policy, &self.context, &self.buffer)? {
                Decision::Defer => {
                    trace!("Waiting for more data ({} bytes buffered)", self.buffer.len());
                    return Ok(Progress::NeedMoreData);
                }
                Decision::Push(layer) => {
                    self.context.push_layer(layer);
                    if layer.takes_over_stream() {
                        info!(
                            "Connection from {} established as {}",
                            self.context.client.address,
                            layer
                        );
                        self.established = Some(layer);
                        return Ok(Progress::Established(layer));
                    }
                    debug!("Pushed {}, resolving next layer", layer);
                }
            }
        }
    }

    /// Record the outcome of the client TLS handshake
    ///
    /// The buffered ciphertext is discarded; bytes fed afterwards are the
    /// decrypted stream, classified for the layer inside client TLS.
    pub fn tls_established(&mut self, sni: Option<String>, alpn: Option<String>) -> Result<()> {
        if self.established != Some(Layer::ClientTls) {
            return Err(ProxyError::Other(
                "No client TLS layer is waiting for its handshake".to_string(),
            ));
        }

        if self.context.client.sni.is_none() {
            self.context.client.sni = sni;
        }
        if self.context.client.alpn.is_none() {
            self.context.client.alpn = alpn;
        }
        debug!(
            "Client TLS established: sni={:?} alpn={:?}",
            self.context.client.sni,
            self.context.client.alpn
        );

        self.buffer.clear();
        self.established = None;
        Ok(())
    }

    /// Read from `reader` until a layer takes over the stream or it ends
    pub async fn run<R>(&mut self, reader: &mut R) -> Result<Progress>
    where
        R: AsyncRead + Unpin,
    {
        let mut progress = self.feed(&[])?;
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        while progress == Progress::NeedMoreData {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                debug!("Client stream ended with {} bytes unclassified", self.buffer.len());
                break;
            }
            progress = self.feed(&chunk[..n])?;
        }

        Ok(progress)
    }
}
