//! 송신자 (클라이언트측)
//!
//! - 한 번에 하나의 유닛만 전송 (Stop-and-Wait)
//! - ACK 타임아웃 시 동일 유닛 재전송, 최대 시도 횟수 제한
//! - REJECT는 재시도 없이 전송 전체 중단

use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::packet::{DataUnit, Outcome, ResponseUnit};
use crate::stats::TransferStats;
use crate::transport::Endpoint;
use crate::{Config, Error, Result};

/// 정상 순서의 전송 유닛 생성 (시퀀스 0..n)
pub fn build_transfer(config: &Config) -> Vec<DataUnit> {
    (0..config.units_per_transfer)
        .map(|i| {
            let content = format!("Creating packet {} ...", i);
            DataUnit::new(config, i as u8, content.as_bytes())
        })
        .collect()
}

/// 송신자
pub struct Sender {
    /// 설정
    config: Config,

    endpoint: Endpoint,

    /// 수신자 주소
    server_addr: SocketAddr,
}

impl Sender {
    pub fn new(config: Config, endpoint: Endpoint, server_addr: SocketAddr) -> Self {
        Self {
            config,
            endpoint,
            server_addr,
        }
    }

    /// 로컬 주소에 바인딩하여 송신자 생성
    pub async fn bind(config: Config, bind_addr: SocketAddr, server_addr: SocketAddr) -> Result<Self> {
        config.validate()?;
        let endpoint = Endpoint::bind(bind_addr).await?;
        info!(
            "SWP Sender bound on {}, server: {}",
            endpoint.local_addr(),
            server_addr
        );
        Ok(Self::new(config, endpoint, server_addr))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// 설정의 시도 횟수/타임아웃으로 전송
    pub async fn run(&self, units: &[DataUnit]) -> Result<TransferStats> {
        self.send_transfer(units, self.config.max_attempts, self.config.ack_timeout())
            .await
    }

    /// 유닛 순서대로 전송
    ///
    /// 현재 유닛이 ACK 되기 전에는 다음 유닛을 보내지 않음.
    /// 모든 유닛이 ACK 되면 통계 반환.
    pub async fn send_transfer(
        &self,
        units: &[DataUnit],
        max_attempts: u32,
        ack_timeout: Duration,
    ) -> Result<TransferStats> {
        self.config.validate()?;
        if max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be > 0".into()));
        }

        let mut stats = TransferStats::new(units.len());
        let mut buf = vec![0u8; self.config.recv_buffer_size];

        for (position, unit) in units.iter().enumerate() {
            self.deliver_unit(position, unit, max_attempts, ack_timeout, &mut buf, &mut stats)
                .await?;
        }

        info!("Transfer complete: {}", stats.summary());
        Ok(stats)
    }

    /// 유닛 하나를 ACK 받을 때까지 전송
    async fn deliver_unit(
        &self,
        position: usize,
        unit: &DataUnit,
        max_attempts: u32,
        ack_timeout: Duration,
        buf: &mut [u8],
        stats: &mut TransferStats,
    ) -> Result<()> {
        let bytes = unit.encode();
        let mut attempt = 1u32;

        info!("Sending packet {} (seq {}). Attempt {}", position, unit.sequence_number, attempt);
        self.transmit(&bytes, stats).await?;

        loop {
            let deadline = Instant::now() + ack_timeout;

            match self.await_response(unit, deadline, buf, stats).await? {
                Some(response) => match response.outcome {
                    Outcome::Acknowledged => {
                        debug!("ACK 수신: packet {}", position);
                        stats.acknowledged_units += 1;
                        return Ok(());
                    }
                    Outcome::Rejected(reason) => {
                        warn!(
                            "REJECT 수신: packet {}, seq {}, reason {}",
                            position, response.sequence_number, reason
                        );
                        return Err(Error::Rejected {
                            position,
                            sequence: response.sequence_number,
                            reason,
                        });
                    }
                },
                None => {
                    stats.timeouts += 1;
                    attempt += 1;
                    if attempt > max_attempts {
                        warn!(
                            "packet {} 재시도 초과: {}회 전송 후 응답 없음",
                            position, max_attempts
                        );
                        return Err(Error::RetriesExhausted {
                            position,
                            sequence: unit.sequence_number,
                            attempts: max_attempts,
                        });
                    }

                    info!("No response for packet {}. Attempt {}. Retransmitting...", position, attempt);
                    stats.retransmissions += 1;
                    self.transmit(&bytes, stats).await?;
                }
            }
        }
    }

    async fn transmit(&self, bytes: &[u8], stats: &mut TransferStats) -> Result<()> {
        self.endpoint.send_to(bytes, self.server_addr).await?;
        stats.transmissions += 1;
        Ok(())
    }

    /// 데드라인까지 현재 유닛에 대한 응답 대기
    ///
    /// 다른 주소나 다른 시퀀스의 응답은 무시하고 같은 데드라인으로 계속 대기.
    /// 데드라인 경과 시 `Ok(None)`.
    async fn await_response(
        &self,
        unit: &DataUnit,
        deadline: Instant,
        buf: &mut [u8],
        stats: &mut TransferStats,
    ) -> Result<Option<ResponseUnit>> {
        loop {
            let Some((len, from)) = self.endpoint.recv_until(buf, deadline).await? else {
                return Ok(None);
            };

            if from != self.server_addr {
                debug!("알 수 없는 주소의 데이터그램 무시: {}", from);
                stats.stray_responses += 1;
                continue;
            }

            let response = ResponseUnit::decode(&buf[..len])?;

            if response.sender_id != unit.sender_id
                || response.sequence_number != unit.sequence_number
            {
                debug!(
                    "다른 유닛의 응답 무시: sender_id={:#04X}, seq={} (대기 중 seq={})",
                    response.sender_id, response.sequence_number, unit.sequence_number
                );
                stats.stray_responses += 1;
                continue;
            }

            return Ok(Some(response));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RejectReason;

    fn test_config() -> Config {
        Config {
            units_per_transfer: 3,
            ..Config::fast_local()
        }
    }

    async fn loopback() -> Endpoint {
        Endpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
    }

    /// 받은 유닛마다 `respond`가 돌려준 데이터그램들을 회신하는 가짜 수신자
    fn spawn_peer<F>(peer: Endpoint, config: Config, mut respond: F)
    where
        F: FnMut(&DataUnit) -> Vec<Vec<u8>> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            while let Ok((len, from)) = peer.recv_from(&mut buf).await {
                let unit = DataUnit::decode(&buf[..len], config.payload_capacity).unwrap();
                for reply in respond(&unit) {
                    peer.send_to(&reply, from).await.unwrap();
                }
            }
        });
    }

    fn reply(unit: &DataUnit, outcome: Outcome, config: &Config) -> Vec<u8> {
        ResponseUnit::for_unit(unit, outcome, config).encode().to_vec()
    }

    #[test]
    fn test_build_transfer() {
        let config = Config::default();
        let units = build_transfer(&config);

        assert_eq!(units.len(), 5);
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.sequence_number as usize, i);
            assert_eq!(unit.declared_length as usize, config.payload_capacity);
            assert_eq!(unit.end_marker, config.end_marker);
            assert_eq!(unit.payload_text(), format!("Creating packet {} ...", i));
        }
    }

    #[tokio::test]
    async fn test_all_acknowledged() {
        let config = test_config();
        let peer = loopback().await;
        let peer_addr = peer.local_addr();
        let cfg = config.clone();
        spawn_peer(peer, config.clone(), move |unit| {
            vec![reply(unit, Outcome::Acknowledged, &cfg)]
        });

        let sender = Sender::new(config.clone(), loopback().await, peer_addr);
        let stats = sender.run(&build_transfer(&config)).await.unwrap();

        assert!(stats.is_complete());
        assert_eq!(stats.transmissions, 3);
        assert_eq!(stats.retransmissions, 0);
    }

    #[tokio::test]
    async fn test_reject_aborts_transfer() {
        let config = test_config();
        let peer = loopback().await;
        let peer_addr = peer.local_addr();
        let cfg = config.clone();
        spawn_peer(peer, config.clone(), move |unit| {
            let outcome = if unit.sequence_number == 1 {
                Outcome::Rejected(RejectReason::BadEndMarker)
            } else {
                Outcome::Acknowledged
            };
            vec![reply(unit, outcome, &cfg)]
        });

        let sender = Sender::new(config.clone(), loopback().await, peer_addr);
        let err = sender.run(&build_transfer(&config)).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Rejected {
                position: 1,
                sequence: 1,
                reason: RejectReason::BadEndMarker
            }
        ));
    }

    #[tokio::test]
    async fn test_retransmits_after_timeout() {
        let config = test_config();
        let peer = loopback().await;
        let peer_addr = peer.local_addr();
        let cfg = config.clone();
        let mut first = true;
        // 첫 데이터그램만 무시
        spawn_peer(peer, config.clone(), move |unit| {
            if std::mem::take(&mut first) {
                return Vec::new();
            }
            vec![reply(unit, Outcome::Acknowledged, &cfg)]
        });

        let sender = Sender::new(config.clone(), loopback().await, peer_addr);
        let stats = sender
            .send_transfer(&build_transfer(&config), 3, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.retransmissions, 1);
        assert_eq!(stats.transmissions, 4);
    }

    #[tokio::test]
    async fn test_stray_response_ignored() {
        let config = test_config();
        let peer = loopback().await;
        let peer_addr = peer.local_addr();
        let cfg = config.clone();
        // 다른 시퀀스의 REJECT를 먼저 보낸 뒤 정상 ACK
        spawn_peer(peer, config.clone(), move |unit| {
            let mut other = unit.clone();
            other.sequence_number = unit.sequence_number.wrapping_add(100);
            vec![
                reply(&other, Outcome::Rejected(RejectReason::DuplicatePacket), &cfg),
                reply(unit, Outcome::Acknowledged, &cfg),
            ]
        });

        let sender = Sender::new(config.clone(), loopback().await, peer_addr);
        let stats = sender.run(&build_transfer(&config)).await.unwrap();

        assert!(stats.is_complete());
        assert_eq!(stats.stray_responses, 3);
        assert_eq!(stats.transmissions, 3);
    }

    #[tokio::test]
    async fn test_malformed_response_aborts() {
        let config = test_config();
        let peer = loopback().await;
        let peer_addr = peer.local_addr();
        spawn_peer(peer, config.clone(), |_| vec![vec![0xFF; 4]]);

        let sender = Sender::new(config.clone(), loopback().await, peer_addr);
        let err = sender.run(&build_transfer(&config)).await.unwrap_err();
        assert!(matches!(err, Error::MalformedPacket { expected: 10, got: 4 }));
        assert!(err.is_fatal_to_transfer());
    }

    #[tokio::test]
    async fn test_unknown_outcome_is_violation() {
        let config = test_config();
        let peer = loopback().await;
        let peer_addr = peer.local_addr();
        spawn_peer(peer, config.clone(), |unit| {
            vec![vec![0xFF, 0xFF, 0x42, 0x00, 0x01, 0x00, 0x00, unit.sequence_number, 0xFF, 0xFF]]
        });

        let sender = Sender::new(config.clone(), loopback().await, peer_addr);
        let err = sender.run(&build_transfer(&config)).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation { outcome: 0x0001, .. }));
    }

    #[tokio::test]
    async fn test_zero_attempts_rejected() {
        let config = test_config();
        let sender = Sender::new(config.clone(), loopback().await, "127.0.0.1:9".parse().unwrap());
        let result = sender
            .send_transfer(&build_transfer(&config), 0, Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_oversized_capacity_rejected_before_sending() {
        let config = Config {
            payload_capacity: 300,
            recv_buffer_size: 4096,
            ..test_config()
        };
        let peer = loopback().await;
        let sender = Sender::new(config.clone(), loopback().await, peer.local_addr());

        let result = sender.run(&build_transfer(&config)).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        // 아무것도 전송되지 않음
        let mut buf = [0u8; 512];
        let got = peer
            .recv_within(&mut buf, Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert!(got.is_none());

        let bound = Sender::bind(config, "127.0.0.1:0".parse().unwrap(), peer.local_addr()).await;
        assert!(matches!(bound, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_send_failure_aborts_with_io() {
        let config = test_config();
        // IPv4 소켓에서 IPv6 주소로 보내면 send_to 자체가 실패
        let sender = Sender::new(config.clone(), loopback().await, "[::1]:9".parse().unwrap());

        let err = sender.run(&build_transfer(&config)).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_fatal_to_transfer());
    }
}
