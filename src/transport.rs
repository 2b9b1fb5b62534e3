//! UDP 전송 shim
//!
//! tokio `UdpSocket` 위의 얇은 래퍼. 프로토콜 로직은 없고
//! 주소 지정 데이터그램 송수신과 데드라인 수신만 담당.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::Result;

/// 데이터그램 엔드포인트
#[derive(Debug, Clone)]
pub struct Endpoint {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl Endpoint {
    /// 주소에 바인딩 (`0.0.0.0:0`이면 OS가 포트 할당)
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 단일 데이터그램 전송
    pub async fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket.send_to(bytes, addr).await?;
        Ok(())
    }

    /// 데이터그램 수신 (무기한 대기)
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.socket.recv_from(buf).await?)
    }

    /// 타임아웃 내 수신
    ///
    /// `timeout`이 None이면 무기한 대기. 데드라인이 먼저 오면 `Ok(None)`.
    pub async fn recv_within(
        &self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<Option<(usize, SocketAddr)>> {
        match timeout {
            Some(timeout) => self.recv_until(buf, Instant::now() + timeout).await,
            None => self.recv_from(buf).await.map(Some),
        }
    }

    /// 절대 데드라인까지 수신
    pub async fn recv_until(
        &self,
        buf: &mut [u8],
        deadline: Instant,
    ) -> Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout_at(deadline, self.socket.recv_from(buf)).await {
            Ok(result) => Ok(Some(result?)),
            Err(_) => Ok(None),
        }
    }
}
