//! 수신자 (서버측)
//!
//! - 4단계 검증 후 ACK 또는 사유 코드가 붙은 REJECT 응답
//! - 한 번에 하나의 송신자 세션만 유지
//! - 비활성 타임아웃 시 세션 리셋 후 새 송신자 대기

use std::net::SocketAddr;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::packet::{DataUnit, Outcome, RejectReason, ResponseUnit};
use crate::stats::ReceiverStats;
use crate::transport::Endpoint;
use crate::{Config, Result};

/// 수신 세션 상태
///
/// `is_active == false`이면 Idle, 아니면 Active(expected_sequence_number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    /// 다음에 순서대로 수락할 시퀀스 번호
    pub expected_sequence_number: u8,

    /// 마지막 리셋 이후 송신자로부터 수신한 적이 있는지
    pub is_active: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 상태로 되돌림
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 유닛 검증 및 응답 생성
///
/// 먼저 일치하는 규칙이 이김:
/// 1. seq > expected → OutOfSequence
/// 2. 선언 길이 ≠ 페이로드 용량 → LengthMismatch
/// 3. 종료 마커 불일치 → BadEndMarker
/// 4. seq < expected → DuplicatePacket
/// 5. 그 외 ACK, expected 증가
///
/// 결과와 상관없이 세션은 활성 상태가 됨.
pub fn handle_incoming(unit: &DataUnit, session: &mut Session, config: &Config) -> ResponseUnit {
    session.is_active = true;

    let outcome = match classify(unit, session.expected_sequence_number, config) {
        Some(reason) => Outcome::Rejected(reason),
        None => {
            session.expected_sequence_number = session.expected_sequence_number.wrapping_add(1);
            Outcome::Acknowledged
        }
    };

    ResponseUnit::for_unit(unit, outcome, config)
}

fn classify(unit: &DataUnit, expected: u8, config: &Config) -> Option<RejectReason> {
    if unit.sequence_number > expected {
        Some(RejectReason::OutOfSequence)
    } else if unit.declared_length as usize != config.payload_capacity {
        Some(RejectReason::LengthMismatch)
    } else if unit.end_marker != config.end_marker {
        Some(RejectReason::BadEndMarker)
    } else if unit.sequence_number < expected {
        Some(RejectReason::DuplicatePacket)
    } else {
        None
    }
}

/// 이벤트 루프 한 번의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// 유닛을 받아 응답을 보냄
    Responded {
        peer: SocketAddr,
        response: ResponseUnit,
    },

    /// 비활성 타임아웃으로 세션 리셋
    SessionReset,

    /// 수신 실패 또는 잘못된 크기의 데이터그램 (응답 없음)
    Dropped,
}

/// 수신자
pub struct Receiver {
    config: Config,
    endpoint: Endpoint,
    session: Session,

    /// 현재 세션의 송신자 주소 (로그용)
    peer: Option<SocketAddr>,

    /// 마지막으로 유닛을 디코딩한 시각 (비활성 데드라인 기준)
    last_unit_at: Instant,

    stats: ReceiverStats,
    buf: Vec<u8>,
}

impl Receiver {
    /// 검증된 설정으로 수신자 생성
    pub fn new(config: Config, endpoint: Endpoint) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            buf: vec![0u8; config.recv_buffer_size],
            config,
            endpoint,
            session: Session::new(),
            peer: None,
            last_unit_at: Instant::now(),
            stats: ReceiverStats::default(),
        })
    }

    /// 주소에 바인딩하여 수신자 생성
    pub async fn bind(config: Config, bind_addr: SocketAddr) -> Result<Self> {
        let endpoint = Endpoint::bind(bind_addr).await?;
        info!("SWP Receiver listening on {}", endpoint.local_addr());
        Self::new(config, endpoint)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// 종료 없이 계속 수신
    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// 이벤트 루프 한 번 실행
    ///
    /// 세션이 활성이면 마지막 유닛 수신 후 비활성 타임아웃까지만 대기,
    /// Idle이면 무기한 대기. 버려진 데이터그램은 데드라인을 늦추지 않음.
    pub async fn step(&mut self) -> ReceiverEvent {
        let received = if self.session.is_active {
            let deadline = self.last_unit_at + self.config.inactivity_timeout();
            self.endpoint.recv_until(&mut self.buf, deadline).await
        } else {
            self.endpoint.recv_from(&mut self.buf).await.map(Some)
        };

        match received {
            Ok(None) => {
                self.reset_session();
                ReceiverEvent::SessionReset
            }
            Ok(Some((len, from))) => {
                match DataUnit::decode(&self.buf[..len], self.config.payload_capacity) {
                    Ok(unit) => self.respond(unit, from).await,
                    Err(e) => {
                        warn!("잘못된 패킷 무시 ({}): {}", from, e);
                        self.stats.malformed += 1;
                        ReceiverEvent::Dropped
                    }
                }
            }
            Err(e) => {
                warn!("수신 에러: {}", e);
                self.stats.malformed += 1;
                ReceiverEvent::Dropped
            }
        }
    }

    fn reset_session(&mut self) {
        info!(
            "Client connection timed out. Waiting for new client on {}",
            self.endpoint.local_addr()
        );
        self.session.reset();
        self.peer = None;
        self.stats.session_resets += 1;
        info!("Receiver stats: {}", self.stats.summary());
    }

    async fn respond(&mut self, unit: DataUnit, from: SocketAddr) -> ReceiverEvent {
        self.last_unit_at = Instant::now();
        if self.peer != Some(from) {
            info!("Sender {} active (sender_id {:#04X})", from, unit.sender_id);
            self.peer = Some(from);
        }
        debug!("Message received from {}: {}", from, unit.payload_text());

        let expected = self.session.expected_sequence_number;
        let response = handle_incoming(&unit, &mut self.session, &self.config);
        self.stats.received += 1;

        match response.outcome {
            Outcome::Acknowledged => {
                info!("Acknowledged packet {}. Sending ACK", unit.sequence_number);
                self.stats.acknowledged += 1;
            }
            Outcome::Rejected(reason) => {
                log_reject(reason, expected, &unit);
                self.stats.record_reject(reason);
            }
        }

        // 응답 전송 실패는 송신자 쪽 문제일 수 있으므로 계속 동작
        if let Err(e) = self.endpoint.send_to(&response.encode(), from).await {
            error!("응답 전송 실패 ({}): {}", from, e);
            self.stats.send_failures += 1;
        }

        ReceiverEvent::Responded {
            peer: from,
            response,
        }
    }
}

fn log_reject(reason: RejectReason, expected: u8, unit: &DataUnit) {
    let seq = unit.sequence_number;
    match reason {
        RejectReason::OutOfSequence => {
            warn!("REJECT OutOfSequence: expected {}, got {}", expected, seq)
        }
        RejectReason::LengthMismatch => warn!(
            "REJECT LengthMismatch: packet {} declares {} bytes",
            seq, unit.declared_length
        ),
        RejectReason::BadEndMarker => warn!(
            "REJECT BadEndMarker: packet {} ends with {:#06X}",
            seq, unit.end_marker
        ),
        RejectReason::DuplicatePacket => {
            warn!("REJECT DuplicatePacket: expected {}, got duplicate {}", expected, seq)
        }
    }
}
